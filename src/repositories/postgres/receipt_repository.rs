use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Coordinates, Receipt};
use crate::repositories::ReceiptStore;

use super::constraint_name;

#[derive(Debug, FromRow)]
struct ReceiptRow {
    id: Uuid,
    receipt_number: String,
    trip_id: Uuid,
    user_id: Uuid,
    vehicle_code: String,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    duration_minutes: i64,
    distance_km: Decimal,
    start_latitude: f64,
    start_longitude: f64,
    end_latitude: f64,
    end_longitude: f64,
    base_cost: Decimal,
    time_cost: Decimal,
    total_cost: Decimal,
    currency: String,
    payment_method: String,
    payment_details: String,
    wallet_balance_before: Decimal,
    wallet_balance_after: Decimal,
    created_at: DateTime<Utc>,
}

impl From<ReceiptRow> for Receipt {
    fn from(row: ReceiptRow) -> Self {
        Receipt {
            id: row.id,
            receipt_number: row.receipt_number,
            trip_id: row.trip_id,
            user_id: row.user_id,
            vehicle_code: row.vehicle_code,
            started_at: row.started_at,
            ended_at: row.ended_at,
            duration_minutes: row.duration_minutes,
            distance_km: row.distance_km,
            start: Coordinates::new(row.start_latitude, row.start_longitude),
            end: Coordinates::new(row.end_latitude, row.end_longitude),
            base_cost: row.base_cost,
            time_cost: row.time_cost,
            total_cost: row.total_cost,
            currency: row.currency,
            payment_method: row.payment_method,
            payment_details: row.payment_details,
            wallet_balance_before: row.wallet_balance_before,
            wallet_balance_after: row.wallet_balance_after,
            created_at: row.created_at,
        }
    }
}

const RECEIPT_COLUMNS: &str = "id, receipt_number, trip_id, user_id, vehicle_code, started_at, \
     ended_at, duration_minutes, distance_km, start_latitude, start_longitude, \
     end_latitude, end_longitude, base_cost, time_cost, total_cost, currency, \
     payment_method, payment_details, wallet_balance_before, wallet_balance_after, created_at";

/// Postgres-backed receipt store.
pub struct PgReceiptStore {
    pool: PgPool,
}

impl PgReceiptStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReceiptStore for PgReceiptStore {
    async fn create(&self, receipt: Receipt) -> Result<Receipt> {
        let trip_id = receipt.trip_id;
        let row = sqlx::query_as::<_, ReceiptRow>(&format!(
            r#"
            INSERT INTO receipts
                (id, receipt_number, trip_id, user_id, vehicle_code, started_at, ended_at,
                 duration_minutes, distance_km, start_latitude, start_longitude,
                 end_latitude, end_longitude, base_cost, time_cost, total_cost, currency,
                 payment_method, payment_details, wallet_balance_before,
                 wallet_balance_after, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20, $21, $22)
            RETURNING {RECEIPT_COLUMNS}
            "#,
        ))
        .bind(receipt.id)
        .bind(&receipt.receipt_number)
        .bind(receipt.trip_id)
        .bind(receipt.user_id)
        .bind(&receipt.vehicle_code)
        .bind(receipt.started_at)
        .bind(receipt.ended_at)
        .bind(receipt.duration_minutes)
        .bind(receipt.distance_km)
        .bind(receipt.start.latitude)
        .bind(receipt.start.longitude)
        .bind(receipt.end.latitude)
        .bind(receipt.end.longitude)
        .bind(receipt.base_cost)
        .bind(receipt.time_cost)
        .bind(receipt.total_cost)
        .bind(&receipt.currency)
        .bind(&receipt.payment_method)
        .bind(&receipt.payment_details)
        .bind(receipt.wallet_balance_before)
        .bind(receipt.wallet_balance_after)
        .bind(receipt.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match constraint_name(&e).as_deref() {
            Some("uq_receipts_trip") => {
                AppError::InvalidState(format!("receipt already issued for trip '{}'", trip_id))
            }
            _ => AppError::Database(e),
        })?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Receipt>> {
        let row = sqlx::query_as::<_, ReceiptRow>(&format!(
            "SELECT {RECEIPT_COLUMNS} FROM receipts WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.map(Receipt::from))
    }

    async fn find_by_trip(&self, trip_id: Uuid) -> Result<Option<Receipt>> {
        let row = sqlx::query_as::<_, ReceiptRow>(&format!(
            "SELECT {RECEIPT_COLUMNS} FROM receipts WHERE trip_id = $1",
        ))
        .bind(trip_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.map(Receipt::from))
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Receipt>> {
        let rows = sqlx::query_as::<_, ReceiptRow>(&format!(
            "SELECT {RECEIPT_COLUMNS} FROM receipts WHERE user_id = $1 ORDER BY created_at DESC",
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows.into_iter().map(Receipt::from).collect())
    }
}
