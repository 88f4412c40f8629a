//! In-memory store implementations.
//!
//! Each store guards its whole state with one async mutex, so the
//! check-then-insert units the traits require are single-writer
//! transactions by construction. Semantics match the Postgres
//! implementations; used by the integration tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    Receipt, Reservation, ReservationStatus, Trip, TripStatus, WalletTransaction,
    WalletTransactionType,
};

use super::{ReceiptStore, ReservationStore, TripStore, WalletStore};

#[derive(Default)]
pub struct InMemoryReservationStore {
    state: Mutex<HashMap<Uuid, Reservation>>,
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn create_exclusive(&self, reservation: Reservation) -> Result<Reservation> {
        let mut state = self.state.lock().await;
        let now = reservation.created_at;

        // Stale Active rows release their slot at read time.
        for existing in state.values_mut() {
            if existing.status == ReservationStatus::Active
                && now >= existing.expires_at
                && (existing.user_id == reservation.user_id
                    || existing.vehicle_id == reservation.vehicle_id)
            {
                existing.status = ReservationStatus::Expired;
            }
        }

        if state
            .values()
            .any(|r| r.status == ReservationStatus::Active && r.user_id == reservation.user_id)
        {
            return Err(AppError::AlreadyReserved);
        }
        if state
            .values()
            .any(|r| r.status == ReservationStatus::Active && r.vehicle_id == reservation.vehicle_id)
        {
            return Err(AppError::VehicleUnavailable);
        }

        state.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Reservation>> {
        Ok(self.state.lock().await.get(&id).cloned())
    }

    async fn find_active_by_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Reservation>> {
        Ok(self
            .state
            .lock()
            .await
            .values()
            .find(|r| r.user_id == user_id && r.is_active_at(now))
            .cloned())
    }

    async fn update(&self, reservation: &Reservation) -> Result<()> {
        let mut state = self.state.lock().await;
        match state.get_mut(&reservation.id) {
            Some(existing) => {
                *existing = reservation.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!(
                "reservation '{}' not found",
                reservation.id
            ))),
        }
    }

    async fn expire_stale(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.lock().await;
        let mut transitioned = 0;
        for reservation in state.values_mut() {
            if reservation.status == ReservationStatus::Active && now >= reservation.expires_at {
                reservation.status = ReservationStatus::Expired;
                transitioned += 1;
            }
        }
        Ok(transitioned)
    }
}

#[derive(Default)]
pub struct InMemoryTripStore {
    state: Mutex<HashMap<Uuid, Trip>>,
}

impl InMemoryTripStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TripStore for InMemoryTripStore {
    async fn create_exclusive(&self, trip: Trip) -> Result<Trip> {
        let mut state = self.state.lock().await;

        if state
            .values()
            .any(|t| t.status == TripStatus::Active && t.user_id == trip.user_id)
        {
            return Err(AppError::InvalidState(
                "user already has an active trip".to_string(),
            ));
        }
        if state
            .values()
            .any(|t| t.status == TripStatus::Active && t.vehicle_id == trip.vehicle_id)
        {
            return Err(AppError::InvalidState(
                "vehicle already has an active trip".to_string(),
            ));
        }

        state.insert(trip.id, trip.clone());
        Ok(trip)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Trip>> {
        Ok(self.state.lock().await.get(&id).cloned())
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> Result<Option<Trip>> {
        Ok(self
            .state
            .lock()
            .await
            .values()
            .find(|t| t.user_id == user_id && t.status == TripStatus::Active)
            .cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Trip>> {
        let mut trips: Vec<Trip> = self
            .state
            .lock()
            .await
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        trips.sort_by_key(|t| std::cmp::Reverse(t.started_at));
        Ok(trips)
    }

    async fn update(&self, trip: &Trip) -> Result<()> {
        let mut state = self.state.lock().await;
        match state.get_mut(&trip.id) {
            Some(existing) => {
                *existing = trip.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("trip '{}' not found", trip.id))),
        }
    }
}

#[derive(Default)]
struct WalletState {
    balances: HashMap<Uuid, Decimal>,
    entries: Vec<WalletTransaction>,
}

#[derive(Default)]
pub struct InMemoryWalletStore {
    state: Mutex<WalletState>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn balance(&self, user_id: Uuid) -> Result<Decimal> {
        Ok(self
            .state
            .lock()
            .await
            .balances
            .get(&user_id)
            .copied()
            .unwrap_or(Decimal::ZERO))
    }

    async fn apply(
        &self,
        user_id: Uuid,
        amount: Decimal,
        transaction_type: WalletTransactionType,
        payment_method: &str,
    ) -> Result<WalletTransaction> {
        let mut state = self.state.lock().await;
        let before = state
            .balances
            .get(&user_id)
            .copied()
            .unwrap_or(Decimal::ZERO);

        if before + amount < Decimal::ZERO {
            return Err(AppError::InsufficientFunds);
        }

        let entry =
            WalletTransaction::new(user_id, amount, transaction_type, payment_method, before);
        state.balances.insert(user_id, entry.balance_after);
        state.entries.push(entry.clone());
        Ok(entry)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<WalletTransaction>> {
        let mut entries: Vec<WalletTransaction> = self
            .state
            .lock()
            .await
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| std::cmp::Reverse(e.created_at));
        Ok(entries)
    }
}

#[derive(Default)]
pub struct InMemoryReceiptStore {
    state: Mutex<HashMap<Uuid, Receipt>>,
}

impl InMemoryReceiptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReceiptStore for InMemoryReceiptStore {
    async fn create(&self, receipt: Receipt) -> Result<Receipt> {
        let mut state = self.state.lock().await;
        if state.values().any(|r| r.trip_id == receipt.trip_id) {
            return Err(AppError::InvalidState(format!(
                "receipt already issued for trip '{}'",
                receipt.trip_id
            )));
        }
        state.insert(receipt.id, receipt.clone());
        Ok(receipt)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Receipt>> {
        Ok(self.state.lock().await.get(&id).cloned())
    }

    async fn find_by_trip(&self, trip_id: Uuid) -> Result<Option<Receipt>> {
        Ok(self
            .state
            .lock()
            .await
            .values()
            .find(|r| r.trip_id == trip_id)
            .cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Receipt>> {
        let mut receipts: Vec<Receipt> = self
            .state
            .lock()
            .await
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        receipts.sort_by_key(|r| std::cmp::Reverse(r.created_at));
        Ok(receipts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn reservation(user_id: Uuid, vehicle_id: Uuid) -> Reservation {
        Reservation::new(user_id, vehicle_id, Duration::minutes(5))
    }

    #[tokio::test]
    async fn test_reservation_exclusivity_per_user() {
        let store = InMemoryReservationStore::new();
        let user = Uuid::new_v4();

        store
            .create_exclusive(reservation(user, Uuid::new_v4()))
            .await
            .expect("first reservation");
        let err = store
            .create_exclusive(reservation(user, Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyReserved));
    }

    #[tokio::test]
    async fn test_reservation_exclusivity_per_vehicle() {
        let store = InMemoryReservationStore::new();
        let vehicle = Uuid::new_v4();

        store
            .create_exclusive(reservation(Uuid::new_v4(), vehicle))
            .await
            .expect("first reservation");
        let err = store
            .create_exclusive(reservation(Uuid::new_v4(), vehicle))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::VehicleUnavailable));
    }

    #[tokio::test]
    async fn test_stale_active_reservation_releases_slot() {
        let store = InMemoryReservationStore::new();
        let vehicle = Uuid::new_v4();

        let mut stale = reservation(Uuid::new_v4(), vehicle);
        stale.created_at = stale.created_at - Duration::minutes(10);
        stale.expires_at = stale.expires_at - Duration::minutes(10);
        store.create_exclusive(stale.clone()).await.unwrap();

        // The deadline passed without a sweep; a new hold must still win.
        let fresh = store
            .create_exclusive(reservation(Uuid::new_v4(), vehicle))
            .await
            .expect("stale hold releases the vehicle");
        assert_eq!(fresh.vehicle_id, vehicle);

        let persisted = store.find_by_id(stale.id).await.unwrap().unwrap();
        assert_eq!(persisted.status, ReservationStatus::Expired);
    }

    #[tokio::test]
    async fn test_expire_stale_counts() {
        let store = InMemoryReservationStore::new();
        let mut stale = reservation(Uuid::new_v4(), Uuid::new_v4());
        stale.expires_at = stale.created_at;
        store.create_exclusive(stale).await.unwrap();
        store
            .create_exclusive(reservation(Uuid::new_v4(), Uuid::new_v4()))
            .await
            .unwrap();

        let transitioned = store.expire_stale(Utc::now()).await.unwrap();
        assert_eq!(transitioned, 1);
        assert_eq!(store.expire_stale(Utc::now()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_wallet_apply_keeps_snapshots() {
        let store = InMemoryWalletStore::new();
        let user = Uuid::new_v4();

        let top_up = store
            .apply(user, dec!(50), WalletTransactionType::TopUp, "CARD ****1234")
            .await
            .unwrap();
        assert_eq!(top_up.balance_before, dec!(0));
        assert_eq!(top_up.balance_after, dec!(50));

        let charge = store
            .apply(user, dec!(-20), WalletTransactionType::TripCharge, "WALLET")
            .await
            .unwrap();
        assert_eq!(charge.balance_before, dec!(50));
        assert_eq!(charge.balance_after, dec!(30));
        assert_eq!(store.balance(user).await.unwrap(), dec!(30));
    }

    #[tokio::test]
    async fn test_wallet_never_goes_negative() {
        let store = InMemoryWalletStore::new();
        let user = Uuid::new_v4();
        store
            .apply(user, dec!(10), WalletTransactionType::TopUp, "CARD ****1234")
            .await
            .unwrap();

        let err = store
            .apply(user, dec!(-11), WalletTransactionType::TripCharge, "WALLET")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientFunds));

        // Nothing was written for the failed debit.
        assert_eq!(store.balance(user).await.unwrap(), dec!(10));
        assert_eq!(store.list_by_user(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_receipt_write_once_per_trip() {
        let store = InMemoryReceiptStore::new();
        let trip_id = Uuid::new_v4();
        let now = Utc::now();
        let receipt = Receipt {
            id: Uuid::new_v4(),
            receipt_number: "RCP-0011AABBCCDD".to_string(),
            trip_id,
            user_id: Uuid::new_v4(),
            vehicle_code: "SC-0042".to_string(),
            started_at: now,
            ended_at: now,
            duration_minutes: 10,
            distance_km: dec!(2.5),
            start: crate::models::Coordinates::new(52.52, 13.405),
            end: crate::models::Coordinates::new(52.53, 13.41),
            base_cost: dec!(5),
            time_cost: dec!(15),
            total_cost: dec!(20),
            currency: "EUR".to_string(),
            payment_method: "WALLET".to_string(),
            payment_details: "wallet balance".to_string(),
            wallet_balance_before: dec!(30),
            wallet_balance_after: dec!(10),
            created_at: now,
        };

        store.create(receipt.clone()).await.expect("first write");

        let mut duplicate = receipt;
        duplicate.id = Uuid::new_v4();
        let err = store.create(duplicate).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }
}
