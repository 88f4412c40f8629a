use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Reservation, ReservationStatus};
use crate::repositories::ReservationStore;

use super::constraint_name;

/// Postgres-backed reservation store.
pub struct PgReservationStore {
    pool: PgPool,
}

impl PgReservationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationStore for PgReservationStore {
    async fn create_exclusive(&self, reservation: Reservation) -> Result<Reservation> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        // Release slots held by stale Active rows before the insert so a
        // lapsed hold never blocks a new one. Scoped to the two slots this
        // insert competes for.
        sqlx::query(
            r#"
            UPDATE reservations
            SET status = 'EXPIRED'
            WHERE status = 'ACTIVE'
              AND expires_at <= $1
              AND (user_id = $2 OR vehicle_id = $3)
            "#,
        )
        .bind(reservation.created_at)
        .bind(reservation.user_id)
        .bind(reservation.vehicle_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        let row = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations (id, user_id, vehicle_id, status, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, vehicle_id, status, created_at, expires_at
            "#,
        )
        .bind(reservation.id)
        .bind(reservation.user_id)
        .bind(reservation.vehicle_id)
        .bind(reservation.status)
        .bind(reservation.created_at)
        .bind(reservation.expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match constraint_name(&e).as_deref() {
            Some("uq_reservations_active_user") => AppError::AlreadyReserved,
            Some("uq_reservations_active_vehicle") => AppError::VehicleUnavailable,
            _ => AppError::Database(e),
        })?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Reservation>> {
        let row = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT id, user_id, vehicle_id, status, created_at, expires_at
            FROM reservations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    async fn find_active_by_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Reservation>> {
        let row = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT id, user_id, vehicle_id, status, created_at, expires_at
            FROM reservations
            WHERE user_id = $1 AND status = 'ACTIVE' AND expires_at > $2
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    async fn update(&self, reservation: &Reservation) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET status = $2
            WHERE id = $1
            "#,
        )
        .bind(reservation.id)
        .bind(reservation.status)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "reservation '{}' not found",
                reservation.id
            )));
        }
        Ok(())
    }

    async fn expire_stale(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET status = $1
            WHERE status = 'ACTIVE' AND expires_at <= $2
            "#,
        )
        .bind(ReservationStatus::Expired)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }
}
