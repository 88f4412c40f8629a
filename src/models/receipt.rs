use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Coordinates;

/// The frozen, auditable summary of a completed trip's cost and payment.
///
/// Created exactly once per completed trip and never updated; the fare
/// breakdown must be reproducible from the recorded timestamps and the
/// deployment's fare schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
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

impl Receipt {
    /// Cross-checks the frozen amounts against each other.
    pub fn is_balanced(&self) -> bool {
        self.total_cost == self.base_cost + self.time_cost
    }
}
