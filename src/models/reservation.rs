use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Status of a reservation in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reservation_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    /// The hold is in effect (subject to the expiry deadline).
    Active,
    /// The user released the hold before expiry.
    Cancelled,
    /// The hold window elapsed without conversion.
    Expired,
    /// The hold was converted into a trip.
    Converted,
}

impl ReservationStatus {
    /// Returns true if the reservation is in a final state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReservationStatus::Active)
    }
}

/// A time-boxed exclusive hold on a vehicle prior to trip start.
///
/// Expiry is derived state: a row may still read `Active` after its deadline
/// passed, so every caller goes through [`Reservation::is_active_at`] rather
/// than trusting the status column alone.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub vehicle_id: Uuid,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Reservation {
    /// Creates a new active reservation holding the vehicle for `hold`.
    pub fn new(user_id: Uuid, vehicle_id: Uuid, hold: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            vehicle_id,
            status: ReservationStatus::Active,
            created_at: now,
            expires_at: now + hold,
        }
    }

    /// True only while the status is Active and the deadline has not passed.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ReservationStatus::Active && now < self.expires_at
    }

    /// Whole seconds left on the hold, clamped at zero.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }

    /// Releases the hold. No fee is charged regardless of elapsed time.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<()> {
        if !self.is_active_at(now) {
            return Err(AppError::InvalidState(format!(
                "cannot cancel reservation in status {:?}",
                self.effective_status(now)
            )));
        }
        self.status = ReservationStatus::Cancelled;
        Ok(())
    }

    /// Converts the hold into a trip. The only path into trip creation.
    pub fn convert(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status == ReservationStatus::Active && now >= self.expires_at {
            return Err(AppError::Expired);
        }
        if self.status != ReservationStatus::Active {
            return Err(AppError::InvalidState(format!(
                "cannot convert reservation in status {:?}",
                self.status
            )));
        }
        self.status = ReservationStatus::Converted;
        Ok(())
    }

    /// Persists the lazy expiry transition. Used by the background sweep.
    pub fn expire(&mut self) -> Result<()> {
        if self.status != ReservationStatus::Active {
            return Err(AppError::InvalidState(format!(
                "cannot expire reservation in status {:?}",
                self.status
            )));
        }
        self.status = ReservationStatus::Expired;
        Ok(())
    }

    /// Status as a reader must interpret it at `now`.
    pub fn effective_status(&self, now: DateTime<Utc>) -> ReservationStatus {
        if self.status == ReservationStatus::Active && now >= self.expires_at {
            ReservationStatus::Expired
        } else {
            self.status
        }
    }
}
