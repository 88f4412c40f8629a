use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::MAX_RATING_COMMENT_LEN;

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

/// Request to place an exclusive hold on a vehicle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReservationRequest {
    pub user_id: Uuid,
    pub vehicle_id: Uuid,
}

/// Request to rate a completed trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateTripRequest {
    pub user_id: Uuid,
    pub stars: u8,
    pub comment: Option<String>,
}

impl RateTripRequest {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if !(1..=5).contains(&self.stars) {
            errors.push(ValidationError {
                field: "stars".to_string(),
                message: "stars must be between 1 and 5".to_string(),
            });
        }
        if let Some(ref comment) = self.comment {
            if comment.chars().count() > MAX_RATING_COMMENT_LEN {
                errors.push(ValidationError {
                    field: "comment".to_string(),
                    message: format!("comment cannot exceed {} characters", MAX_RATING_COMMENT_LEN),
                });
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Request to add funds to the wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopUpRequest {
    pub user_id: Uuid,
    pub amount: Decimal,
    /// Funding source label, e.g. `CARD ****1234`.
    pub payment_method: Option<String>,
}

impl TopUpRequest {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.amount <= Decimal::ZERO {
            errors.push(ValidationError {
                field: "amount".to_string(),
                message: "amount must be positive".to_string(),
            });
        }
        if let Some(ref method) = self.payment_method {
            if method.trim().is_empty() {
                errors.push(ValidationError {
                    field: "payment_method".to_string(),
                    message: "payment_method cannot be empty".to_string(),
                });
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Caller identification for operations without a body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserQuery {
    pub user_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rate_trip_request_validation() {
        let valid = RateTripRequest {
            user_id: Uuid::new_v4(),
            stars: 4,
            comment: Some("smooth ride".to_string()),
        };
        assert!(valid.validate().is_ok());

        let too_many_stars = RateTripRequest {
            user_id: Uuid::new_v4(),
            stars: 6,
            comment: None,
        };
        assert!(too_many_stars.validate().is_err());

        let long_comment = RateTripRequest {
            user_id: Uuid::new_v4(),
            stars: 3,
            comment: Some("x".repeat(MAX_RATING_COMMENT_LEN + 1)),
        };
        assert!(long_comment.validate().is_err());
    }

    #[test]
    fn test_top_up_request_validation() {
        let valid = TopUpRequest {
            user_id: Uuid::new_v4(),
            amount: dec!(25),
            payment_method: None,
        };
        assert!(valid.validate().is_ok());

        let zero = TopUpRequest {
            user_id: Uuid::new_v4(),
            amount: dec!(0),
            payment_method: None,
        };
        assert!(zero.validate().is_err());
    }
}
