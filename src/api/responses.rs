use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Coordinates, Rating, Receipt, Reservation, ReservationStatus, Trip, TripStatus,
    WalletTransaction, WalletTransactionType,
};

/// Standard API response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorResponse>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(error: ErrorResponse) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

/// Error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<ValidationErrorDetail>) -> Self {
        self.details = Some(details);
        self
    }
}

/// Validation error detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub services: ServiceHealth,
}

/// Service health status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub database: bool,
}

/// Reservation response DTO, carrying the client-facing countdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub vehicle_id: Uuid,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub remaining_seconds: i64,
}

impl ReservationResponse {
    /// Renders the reservation as a reader must see it at `now`: a lapsed
    /// Active row reports Expired with zero seconds remaining.
    pub fn at(reservation: Reservation, now: DateTime<Utc>) -> Self {
        Self {
            status: reservation.effective_status(now),
            remaining_seconds: reservation.remaining_seconds(now),
            id: reservation.id,
            user_id: reservation.user_id,
            vehicle_id: reservation.vehicle_id,
            created_at: reservation.created_at,
            expires_at: reservation.expires_at,
        }
    }
}

/// Trip response DTO.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub vehicle_id: Uuid,
    pub vehicle_code: String,
    pub status: TripStatus,
    pub started_at: DateTime<Utc>,
    pub start: Coordinates,
    pub ended_at: Option<DateTime<Utc>>,
    pub end: Option<Coordinates>,
    pub distance_km: Option<Decimal>,
    pub rating: Option<Rating>,
}

impl From<Trip> for TripResponse {
    fn from(trip: Trip) -> Self {
        Self {
            id: trip.id,
            user_id: trip.user_id,
            vehicle_id: trip.vehicle_id,
            vehicle_code: trip.vehicle_code,
            status: trip.status,
            started_at: trip.started_at,
            start: trip.start,
            ended_at: trip.ended_at,
            end: trip.end,
            distance_km: trip.distance_km,
            rating: trip.rating,
        }
    }
}

/// Wallet balance response DTO.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub user_id: Uuid,
    pub balance: Decimal,
}

/// Wallet ledger entry response DTO.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTransactionResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub transaction_type: WalletTransactionType,
    pub payment_method: String,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<WalletTransaction> for WalletTransactionResponse {
    fn from(tx: WalletTransaction) -> Self {
        Self {
            id: tx.id,
            user_id: tx.user_id,
            amount: tx.amount,
            transaction_type: tx.transaction_type,
            payment_method: tx.payment_method,
            balance_before: tx.balance_before,
            balance_after: tx.balance_after,
            created_at: tx.created_at,
        }
    }
}

/// Receipt response DTO.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptResponse {
    pub id: Uuid,
    pub receipt_number: String,
    pub trip_id: Uuid,
    pub user_id: Uuid,
    pub vehicle_code: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub distance_km: Decimal,
    pub start: Coordinates,
    pub end: Coordinates,
    pub base_cost: Decimal,
    pub time_cost: Decimal,
    pub total_cost: Decimal,
    pub currency: String,
    pub payment_method: String,
    pub payment_details: String,
    pub wallet_balance_before: Decimal,
    pub wallet_balance_after: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<Receipt> for ReceiptResponse {
    fn from(receipt: Receipt) -> Self {
        Self {
            id: receipt.id,
            receipt_number: receipt.receipt_number,
            trip_id: receipt.trip_id,
            user_id: receipt.user_id,
            vehicle_code: receipt.vehicle_code,
            started_at: receipt.started_at,
            ended_at: receipt.ended_at,
            duration_minutes: receipt.duration_minutes,
            distance_km: receipt.distance_km,
            start: receipt.start,
            end: receipt.end,
            base_cost: receipt.base_cost,
            time_cost: receipt.time_cost,
            total_cost: receipt.total_cost,
            currency: receipt.currency,
            payment_method: receipt.payment_method,
            payment_details: receipt.payment_details,
            wallet_balance_before: receipt.wallet_balance_before,
            wallet_balance_after: receipt.wallet_balance_after,
            created_at: receipt.created_at,
        }
    }
}

/// Trip completion response: the closed trip and its receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripCompletionResponse {
    pub trip: TripResponse,
    pub receipt: ReceiptResponse,
}
