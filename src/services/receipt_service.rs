use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::fare::FareBreakdown;
use crate::models::{Coordinates, Receipt, Trip};
use crate::repositories::ReceiptStore;

use super::settlement_service::SettlementOutcome;

/// Assembles the immutable settlement record once a trip ends.
pub struct ReceiptService {
    receipts: Arc<dyn ReceiptStore>,
    currency: String,
}

impl ReceiptService {
    pub fn new(receipts: Arc<dyn ReceiptStore>, currency: impl Into<String>) -> Self {
        Self {
            receipts,
            currency: currency.into(),
        }
    }

    /// Derives a stable receipt number from the trip's identifying
    /// attributes using SHA-256.
    pub fn receipt_number(trip_id: Uuid, user_id: Uuid, ended_at: DateTime<Utc>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(trip_id.as_bytes());
        hasher.update(b"|");
        hasher.update(user_id.as_bytes());
        hasher.update(b"|");
        hasher.update(ended_at.timestamp_millis().to_be_bytes());
        let digest = hasher.finalize();
        format!("RCP-{}", hex::encode(&digest[..6]).to_uppercase())
    }

    /// Freezes the fare breakdown and payment outcome into a receipt.
    /// Write-once: a second receipt for the same trip is rejected by the
    /// store.
    pub async fn issue(
        &self,
        trip: &Trip,
        ended_at: DateTime<Utc>,
        end: Coordinates,
        distance_km: Decimal,
        fare: &FareBreakdown,
        settlement: &SettlementOutcome,
    ) -> Result<Receipt> {
        let receipt = Receipt {
            id: Uuid::new_v4(),
            receipt_number: Self::receipt_number(trip.id, trip.user_id, ended_at),
            trip_id: trip.id,
            user_id: trip.user_id,
            vehicle_code: trip.vehicle_code.clone(),
            started_at: trip.started_at,
            ended_at,
            duration_minutes: fare.billable_minutes,
            distance_km,
            start: trip.start,
            end,
            base_cost: fare.base_cost,
            time_cost: fare.time_cost,
            total_cost: fare.total_cost,
            currency: self.currency.clone(),
            payment_method: settlement.payment_method.clone(),
            payment_details: settlement.payment_details.clone(),
            wallet_balance_before: settlement.ledger_entry.balance_before,
            wallet_balance_after: settlement.ledger_entry.balance_after,
            created_at: Utc::now(),
        };

        let receipt = self.receipts.create(receipt).await?;
        info!(
            "issued receipt {} for trip {}",
            receipt.receipt_number, trip.id
        );
        Ok(receipt)
    }

    pub async fn get(&self, id: Uuid, user_id: Uuid) -> Result<Receipt> {
        let receipt = self
            .receipts
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("receipt '{}' not found", id)))?;
        if receipt.user_id != user_id {
            return Err(AppError::Unauthorized(
                "receipt belongs to another user".to_string(),
            ));
        }
        Ok(receipt)
    }

    pub async fn find_by_trip(&self, trip_id: Uuid, user_id: Uuid) -> Result<Receipt> {
        let receipt = self
            .receipts
            .find_by_trip(trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no receipt for trip '{}'", trip_id)))?;
        if receipt.user_id != user_id {
            return Err(AppError::Unauthorized(
                "receipt belongs to another user".to_string(),
            ));
        }
        Ok(receipt)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Receipt>> {
        self.receipts.list_by_user(user_id).await
    }
}
