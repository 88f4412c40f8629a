use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

use super::Coordinates;

/// Upper bound for rating comments.
pub const MAX_RATING_COMMENT_LEN: usize = 500;

/// Status of a trip in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "trip_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    Active,
    Completed,
    Cancelled,
}

impl TripStatus {
    /// Returns true if the trip is in a final state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TripStatus::Active)
    }
}

/// A star rating attached to a completed trip, settable once by the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub stars: u8,
    pub comment: Option<String>,
}

impl Rating {
    pub fn new(stars: u8, comment: Option<String>) -> Result<Self> {
        if !(1..=5).contains(&stars) {
            return Err(AppError::Validation(format!(
                "stars must be between 1 and 5, got {}",
                stars
            )));
        }
        if let Some(ref c) = comment {
            if c.chars().count() > MAX_RATING_COMMENT_LEN {
                return Err(AppError::Validation(format!(
                    "comment exceeds {} characters",
                    MAX_RATING_COMMENT_LEN
                )));
            }
        }
        Ok(Self { stars, comment })
    }
}

/// An in-progress billed rental created from a converted reservation.
///
/// Fare and duration are derived from `started_at` on every read; no running
/// totals are stored while the trip is active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub user_id: Uuid,
    pub vehicle_id: Uuid,
    /// Fleet code captured at start time for receipts.
    pub vehicle_code: String,
    pub status: TripStatus,
    pub started_at: DateTime<Utc>,
    pub start: Coordinates,
    pub ended_at: Option<DateTime<Utc>>,
    pub end: Option<Coordinates>,
    pub distance_km: Option<Decimal>,
    pub rating: Option<Rating>,
}

impl Trip {
    /// Starts a trip at the vehicle's current position.
    pub fn new(user_id: Uuid, vehicle_id: Uuid, vehicle_code: String, start: Coordinates) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            vehicle_id,
            vehicle_code,
            status: TripStatus::Active,
            started_at: Utc::now(),
            start,
            ended_at: None,
            end: None,
            distance_km: None,
            rating: None,
        }
    }

    /// Elapsed riding time at `now` (or at the frozen end time).
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        let until = self.ended_at.unwrap_or(now);
        (until - self.started_at).max(Duration::zero())
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    /// Freezes end time, position and distance. Only valid from Active;
    /// settlement must already have succeeded when this is called.
    pub fn complete(
        &mut self,
        ended_at: DateTime<Utc>,
        end: Coordinates,
        distance_km: Decimal,
    ) -> Result<()> {
        if self.status != TripStatus::Active {
            return Err(AppError::InvalidState(format!(
                "cannot complete trip in status {:?}",
                self.status
            )));
        }
        self.status = TripStatus::Completed;
        self.ended_at = Some(ended_at);
        self.end = Some(end);
        self.distance_km = Some(distance_km);
        Ok(())
    }

    /// Cancels a trip without charge. Only valid from Active.
    pub fn cancel(&mut self, ended_at: DateTime<Utc>) -> Result<()> {
        if self.status != TripStatus::Active {
            return Err(AppError::InvalidState(format!(
                "cannot cancel trip in status {:?}",
                self.status
            )));
        }
        self.status = TripStatus::Cancelled;
        self.ended_at = Some(ended_at);
        Ok(())
    }

    /// Attaches a rating: owner only, completed trips only, once only.
    pub fn apply_rating(&mut self, user_id: Uuid, rating: Rating) -> Result<()> {
        if !self.is_owned_by(user_id) {
            return Err(AppError::Unauthorized(
                "only the trip owner may rate it".to_string(),
            ));
        }
        if self.status != TripStatus::Completed {
            return Err(AppError::InvalidState(format!(
                "cannot rate trip in status {:?}",
                self.status
            )));
        }
        if self.rating.is_some() {
            return Err(AppError::InvalidState("trip is already rated".to_string()));
        }
        self.rating = Some(rating);
        Ok(())
    }
}
