use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Coordinates, Rating, Trip, TripStatus};
use crate::repositories::TripStore;

use super::constraint_name;

/// Flat row shape for the `trips` table; coordinates and rating are
/// re-assembled into their domain types on read.
#[derive(Debug, FromRow)]
struct TripRow {
    id: Uuid,
    user_id: Uuid,
    vehicle_id: Uuid,
    vehicle_code: String,
    status: TripStatus,
    started_at: DateTime<Utc>,
    start_latitude: f64,
    start_longitude: f64,
    ended_at: Option<DateTime<Utc>>,
    end_latitude: Option<f64>,
    end_longitude: Option<f64>,
    distance_km: Option<Decimal>,
    rating_stars: Option<i32>,
    rating_comment: Option<String>,
}

impl From<TripRow> for Trip {
    fn from(row: TripRow) -> Self {
        let end = match (row.end_latitude, row.end_longitude) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        };
        let rating = row.rating_stars.map(|stars| Rating {
            stars: stars as u8,
            comment: row.rating_comment,
        });
        Trip {
            id: row.id,
            user_id: row.user_id,
            vehicle_id: row.vehicle_id,
            vehicle_code: row.vehicle_code,
            status: row.status,
            started_at: row.started_at,
            start: Coordinates::new(row.start_latitude, row.start_longitude),
            ended_at: row.ended_at,
            end,
            distance_km: row.distance_km,
            rating,
        }
    }
}

const TRIP_COLUMNS: &str = "id, user_id, vehicle_id, vehicle_code, status, started_at, \
     start_latitude, start_longitude, ended_at, end_latitude, end_longitude, \
     distance_km, rating_stars, rating_comment";

/// Postgres-backed trip store.
pub struct PgTripStore {
    pool: PgPool,
}

impl PgTripStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TripStore for PgTripStore {
    async fn create_exclusive(&self, trip: Trip) -> Result<Trip> {
        let row = sqlx::query_as::<_, TripRow>(&format!(
            r#"
            INSERT INTO trips (id, user_id, vehicle_id, vehicle_code, status, started_at,
                               start_latitude, start_longitude)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TRIP_COLUMNS}
            "#,
        ))
        .bind(trip.id)
        .bind(trip.user_id)
        .bind(trip.vehicle_id)
        .bind(&trip.vehicle_code)
        .bind(trip.status)
        .bind(trip.started_at)
        .bind(trip.start.latitude)
        .bind(trip.start.longitude)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match constraint_name(&e).as_deref() {
            Some("uq_trips_active_user") => {
                AppError::InvalidState("user already has an active trip".to_string())
            }
            Some("uq_trips_active_vehicle") => {
                AppError::InvalidState("vehicle already has an active trip".to_string())
            }
            _ => AppError::Database(e),
        })?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Trip>> {
        let row = sqlx::query_as::<_, TripRow>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.map(Trip::from))
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> Result<Option<Trip>> {
        let row = sqlx::query_as::<_, TripRow>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips WHERE user_id = $1 AND status = 'ACTIVE'",
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.map(Trip::from))
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Trip>> {
        let rows = sqlx::query_as::<_, TripRow>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips WHERE user_id = $1 ORDER BY started_at DESC",
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows.into_iter().map(Trip::from).collect())
    }

    async fn update(&self, trip: &Trip) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE trips
            SET status = $2,
                ended_at = $3,
                end_latitude = $4,
                end_longitude = $5,
                distance_km = $6,
                rating_stars = $7,
                rating_comment = $8
            WHERE id = $1
            "#,
        )
        .bind(trip.id)
        .bind(trip.status)
        .bind(trip.ended_at)
        .bind(trip.end.map(|c| c.latitude))
        .bind(trip.end.map(|c| c.longitude))
        .bind(trip.distance_km)
        .bind(trip.rating.as_ref().map(|r| r.stars as i32))
        .bind(trip.rating.as_ref().and_then(|r| r.comment.clone()))
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("trip '{}' not found", trip.id)));
        }
        Ok(())
    }
}
