use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;
use uuid::Uuid;

use crate::collaborators::{FleetClient, IdentityClient};
use crate::error::{AppError, Result};
use crate::models::Reservation;
use crate::observability::get_metrics;
use crate::repositories::ReservationStore;

/// Owns the reservation lifecycle: exclusive creation, countdown, cancel,
/// and the background expiry sweep. Conversion into a trip lives in
/// [`crate::services::TripService`], which is the only consumer of
/// [`Reservation::convert`].
pub struct ReservationService {
    reservations: Arc<dyn ReservationStore>,
    fleet: Arc<dyn FleetClient>,
    identity: Arc<dyn IdentityClient>,
    hold: Duration,
}

impl ReservationService {
    pub fn new(
        reservations: Arc<dyn ReservationStore>,
        fleet: Arc<dyn FleetClient>,
        identity: Arc<dyn IdentityClient>,
        hold_minutes: i64,
    ) -> Self {
        Self {
            reservations,
            fleet,
            identity,
            hold: Duration::minutes(hold_minutes),
        }
    }

    /// Places an exclusive hold on the vehicle.
    ///
    /// The store performs the exclusivity check and the insert as one atomic
    /// unit, so concurrent calls for the same vehicle produce exactly one
    /// Active reservation.
    pub async fn create(&self, user_id: Uuid, vehicle_id: Uuid) -> Result<Reservation> {
        self.identity.verify_user(user_id).await?;

        let vehicle = self.fleet.vehicle(vehicle_id).await?;
        if !vehicle.status.is_rentable() {
            get_metrics().record_reservation_rejected("VEHICLE_UNAVAILABLE");
            return Err(AppError::VehicleUnavailable);
        }

        let reservation = Reservation::new(user_id, vehicle_id, self.hold);
        let created = self
            .reservations
            .create_exclusive(reservation)
            .await
            .map_err(|e| {
                if e.is_business() {
                    get_metrics().record_reservation_rejected(e.code());
                }
                e
            })?;

        info!(
            "reservation {} created: user {} holds vehicle {} until {}",
            created.id, created.user_id, created.vehicle_id, created.expires_at
        );
        get_metrics().record_reservation_created();
        Ok(created)
    }

    async fn load_owned(&self, id: Uuid, user_id: Uuid) -> Result<Reservation> {
        let reservation = self
            .reservations
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("reservation '{}' not found", id)))?;
        if reservation.user_id != user_id {
            return Err(AppError::Unauthorized(
                "reservation belongs to another user".to_string(),
            ));
        }
        Ok(reservation)
    }

    pub async fn get(&self, id: Uuid, user_id: Uuid) -> Result<Reservation> {
        self.load_owned(id, user_id).await
    }

    /// The user's live reservation, if any.
    pub async fn current_for_user(&self, user_id: Uuid) -> Result<Option<Reservation>> {
        self.reservations
            .find_active_by_user(user_id, Utc::now())
            .await
    }

    /// Client-facing countdown in whole seconds.
    pub async fn remaining_seconds(&self, id: Uuid, user_id: Uuid) -> Result<i64> {
        let reservation = self.load_owned(id, user_id).await?;
        Ok(reservation.remaining_seconds(Utc::now()))
    }

    /// Releases the hold. Free of charge regardless of elapsed time.
    pub async fn cancel(&self, id: Uuid, user_id: Uuid) -> Result<Reservation> {
        let mut reservation = self.load_owned(id, user_id).await?;
        reservation.cancel(Utc::now())?;
        self.reservations.update(&reservation).await?;
        info!("reservation {} cancelled by user {}", id, user_id);
        Ok(reservation)
    }

    /// Persists the lazy Expired transition on stale holds so their
    /// exclusivity slots are released even when nobody reads them.
    pub async fn sweep_expired(&self) -> Result<u64> {
        let transitioned = self.reservations.expire_stale(Utc::now()).await?;
        if transitioned > 0 {
            info!("expiry sweep transitioned {} reservations", transitioned);
            get_metrics().record_reservations_expired(transitioned);
        }
        Ok(transitioned)
    }
}
