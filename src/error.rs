use thiserror::Error;

/// Convenience result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type.
///
/// Business outcomes are ordinary values returned to the caller; only the
/// infrastructure variants abort a request without mutating state.
#[derive(Debug, Error)]
pub enum AppError {
    /// The user already holds an active reservation.
    #[error("user already holds an active reservation")]
    AlreadyReserved,

    /// The vehicle is already held by an active reservation.
    #[error("vehicle is already reserved")]
    VehicleUnavailable,

    /// A transition was attempted from a state that does not allow it.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The reservation's hold window has elapsed.
    #[error("reservation has expired")]
    Expired,

    /// The caller does not own the resource it is acting on.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Settlement exhausted its retries or the card was declined.
    #[error("payment failed: {0}")]
    PaymentFailed(String),

    /// The wallet balance cannot cover the requested debit.
    #[error("insufficient wallet funds")]
    InsufficientFunds,

    /// The referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Request-level validation failure.
    #[error("validation error: {0}")]
    Validation(String),

    /// Database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Payment gateway transport failure.
    #[error("gateway error: {0}")]
    Gateway(String),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Returns true for recoverable business outcomes that the API layer
    /// maps to client-facing messages, as opposed to infrastructure faults.
    pub fn is_business(&self) -> bool {
        !matches!(
            self,
            AppError::Database(_) | AppError::Gateway(_) | AppError::Internal(_)
        )
    }

    /// Short machine-readable code for responses and metrics labels.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::AlreadyReserved => "ALREADY_RESERVED",
            AppError::VehicleUnavailable => "VEHICLE_UNAVAILABLE",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::Expired => "EXPIRED",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::PaymentFailed(_) => "PAYMENT_FAILED",
            AppError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Gateway(_) => "GATEWAY_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_errors_classified() {
        assert!(AppError::AlreadyReserved.is_business());
        assert!(AppError::Expired.is_business());
        assert!(AppError::PaymentFailed("declined".to_string()).is_business());
        assert!(!AppError::Gateway("connection refused".to_string()).is_business());
        assert!(!AppError::Internal(anyhow::anyhow!("boom")).is_business());
    }

    #[test]
    fn test_error_codes_distinct() {
        assert_eq!(AppError::PaymentFailed("x".to_string()).code(), "PAYMENT_FAILED");
        assert_eq!(
            AppError::InvalidState("x".to_string()).code(),
            "INVALID_STATE"
        );
        assert_ne!(
            AppError::PaymentFailed("x".to_string()).code(),
            AppError::InvalidState("x".to_string()).code()
        );
    }
}
