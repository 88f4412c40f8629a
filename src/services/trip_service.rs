use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::collaborators::{DistanceSource, FleetClient};
use crate::error::{AppError, Result};
use crate::fare::FareSchedule;
use crate::models::{Rating, Receipt, Reservation, Trip, TripStatus};
use crate::observability::get_metrics;
use crate::repositories::{ReservationStore, TripStore};

use super::receipt_service::ReceiptService;
use super::settlement_service::SettlementService;

/// Live fare view of an active trip. Computed on demand, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct TripQuote {
    pub trip_id: Uuid,
    pub billable_minutes: i64,
    pub current_cost: Decimal,
    pub battery_percent: u8,
    pub low_battery: bool,
}

/// Owns the trip lifecycle from reservation conversion to settlement and
/// receipt.
pub struct TripService {
    trips: Arc<dyn TripStore>,
    reservations: Arc<dyn ReservationStore>,
    fleet: Arc<dyn FleetClient>,
    distance: Arc<dyn DistanceSource>,
    settlement: Arc<SettlementService>,
    receipts: Arc<ReceiptService>,
    fare: FareSchedule,
    low_battery_threshold: u8,
}

impl TripService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        trips: Arc<dyn TripStore>,
        reservations: Arc<dyn ReservationStore>,
        fleet: Arc<dyn FleetClient>,
        distance: Arc<dyn DistanceSource>,
        settlement: Arc<SettlementService>,
        receipts: Arc<ReceiptService>,
        fare: FareSchedule,
        low_battery_threshold: u8,
    ) -> Self {
        Self {
            trips,
            reservations,
            fleet,
            distance,
            settlement,
            receipts,
            fare,
            low_battery_threshold,
        }
    }

    /// Converts an active reservation into a trip. The only path into trip
    /// creation; fails with `Expired` once the hold deadline passed.
    pub async fn start_from_reservation(
        &self,
        reservation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Trip> {
        let mut reservation: Reservation = self
            .reservations
            .find_by_id(reservation_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("reservation '{}' not found", reservation_id))
            })?;
        if reservation.user_id != user_id {
            return Err(AppError::Unauthorized(
                "reservation belongs to another user".to_string(),
            ));
        }

        reservation.convert(Utc::now())?;

        let vehicle = self.fleet.vehicle(reservation.vehicle_id).await?;
        let trip = Trip::new(
            user_id,
            reservation.vehicle_id,
            vehicle.code.clone(),
            vehicle.coordinates,
        );

        // Trip first: a lost race on the active-trip invariant must leave
        // the reservation untouched and convertible again.
        let trip = self.trips.create_exclusive(trip).await?;
        self.reservations.update(&reservation).await?;

        info!(
            "reservation {} converted: trip {} started on vehicle {}",
            reservation_id, trip.id, vehicle.code
        );
        get_metrics().record_reservation_converted();
        get_metrics().record_trip_started();
        Ok(trip)
    }

    async fn load_owned(&self, trip_id: Uuid, user_id: Uuid) -> Result<Trip> {
        let trip = self
            .trips
            .find_by_id(trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("trip '{}' not found", trip_id)))?;
        if !trip.is_owned_by(user_id) {
            return Err(AppError::Unauthorized(
                "trip belongs to another user".to_string(),
            ));
        }
        Ok(trip)
    }

    pub async fn get(&self, trip_id: Uuid, user_id: Uuid) -> Result<Trip> {
        self.load_owned(trip_id, user_id).await
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Trip>> {
        self.trips.list_by_user(user_id).await
    }

    /// Live fare and battery advisory for an active trip.
    pub async fn quote(&self, trip_id: Uuid, user_id: Uuid) -> Result<TripQuote> {
        let trip = self.load_owned(trip_id, user_id).await?;
        if trip.status != TripStatus::Active {
            return Err(AppError::InvalidState(format!(
                "cannot quote trip in status {:?}",
                trip.status
            )));
        }

        let vehicle = self.fleet.vehicle(trip.vehicle_id).await?;
        let breakdown = self.fare.breakdown(trip.elapsed(Utc::now()));

        Ok(TripQuote {
            trip_id: trip.id,
            billable_minutes: breakdown.billable_minutes,
            current_cost: breakdown.total_cost,
            battery_percent: vehicle.battery_percent,
            low_battery: vehicle.is_low_battery(self.low_battery_threshold),
        })
    }

    /// Ends the trip: freezes the fare, settles payment, issues the receipt
    /// and completes the trip, in that order.
    ///
    /// A settlement failure propagates as `PaymentFailed` and leaves the
    /// trip Active so the user can retry ending it.
    pub async fn end_trip(&self, trip_id: Uuid, user_id: Uuid) -> Result<(Trip, Receipt)> {
        let mut trip = self.load_owned(trip_id, user_id).await?;
        if trip.status != TripStatus::Active {
            return Err(AppError::InvalidState(format!(
                "cannot end trip in status {:?}",
                trip.status
            )));
        }

        let now = Utc::now();
        let vehicle = self.fleet.vehicle(trip.vehicle_id).await?;
        if vehicle.is_low_battery(self.low_battery_threshold) {
            // Advisory only; never blocks the transition.
            warn!(
                "vehicle {} ended trip {} at {}% battery",
                vehicle.code, trip.id, vehicle.battery_percent
            );
        }

        let breakdown = self.fare.breakdown(trip.elapsed(now));
        let distance_km = self.distance.trip_distance_km(&trip, now);

        let settlement = self
            .settlement
            .settle_trip(user_id, breakdown.total_cost)
            .await?;

        let receipt = self
            .receipts
            .issue(
                &trip,
                now,
                vehicle.coordinates,
                distance_km,
                &breakdown,
                &settlement,
            )
            .await?;

        trip.complete(now, vehicle.coordinates, distance_km)?;
        self.trips.update(&trip).await?;

        info!(
            "trip {} completed: {} minutes, {} {} via {}",
            trip.id,
            breakdown.billable_minutes,
            breakdown.total_cost,
            receipt.currency,
            settlement.payment_method
        );
        get_metrics().record_trip_completed(breakdown.billable_minutes);
        Ok((trip, receipt))
    }

    /// Cancels an active trip without charge. No receipt is produced.
    pub async fn cancel_trip(&self, trip_id: Uuid, user_id: Uuid) -> Result<Trip> {
        let mut trip = self.load_owned(trip_id, user_id).await?;
        trip.cancel(Utc::now())?;
        self.trips.update(&trip).await?;
        info!("trip {} cancelled by user {}", trip_id, user_id);
        get_metrics().record_trip_cancelled();
        Ok(trip)
    }

    /// Attaches a one-time rating to a completed trip.
    pub async fn add_rating(
        &self,
        trip_id: Uuid,
        user_id: Uuid,
        stars: u8,
        comment: Option<String>,
    ) -> Result<Trip> {
        let mut trip = self
            .trips
            .find_by_id(trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("trip '{}' not found", trip_id)))?;

        let rating = Rating::new(stars, comment)?;
        trip.apply_rating(user_id, rating)?;
        self.trips.update(&trip).await?;
        Ok(trip)
    }
}
