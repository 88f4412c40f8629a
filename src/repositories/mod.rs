pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Receipt, Reservation, Trip, WalletTransaction, WalletTransactionType};

pub use memory::{
    InMemoryReceiptStore, InMemoryReservationStore, InMemoryTripStore, InMemoryWalletStore,
};
pub use postgres::{PgReceiptStore, PgReservationStore, PgTripStore, PgWalletStore};

/// Database connection pool type alias.
pub type DbPool = PgPool;

/// Storage contract for reservations.
///
/// `create_exclusive` is the serialization point for the one-active-hold
/// invariants: the exclusivity check and the insert execute as a single
/// atomic unit, with `reservation.created_at` as the clock for fencing out
/// stale Active rows whose deadline already passed.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Inserts iff the user and the vehicle hold no live reservation.
    /// Fails with `AlreadyReserved` (user) or `VehicleUnavailable` (vehicle).
    async fn create_exclusive(&self, reservation: Reservation) -> Result<Reservation>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Reservation>>;

    /// The user's live reservation at `now`, if any.
    async fn find_active_by_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Reservation>>;

    /// Persists a status transition decided by the state machine.
    async fn update(&self, reservation: &Reservation) -> Result<()>;

    /// Persists Expired on Active rows past their deadline; returns how many
    /// rows transitioned. Run by the background sweep.
    async fn expire_stale(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Storage contract for trips. Mirrors the reservation exclusivity unit for
/// the one-active-trip-per-user/vehicle invariants.
#[async_trait]
pub trait TripStore: Send + Sync {
    async fn create_exclusive(&self, trip: Trip) -> Result<Trip>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Trip>>;
    async fn find_active_by_user(&self, user_id: Uuid) -> Result<Option<Trip>>;
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Trip>>;
    async fn update(&self, trip: &Trip) -> Result<()>;
}

/// Storage contract for the wallet ledger.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Current balance; zero for a wallet that has never transacted.
    async fn balance(&self, user_id: Uuid) -> Result<Decimal>;

    /// Applies a signed balance change and appends the ledger entry in one
    /// atomic unit. Fails with `InsufficientFunds` when the change would
    /// drive the balance negative; on failure nothing is written.
    async fn apply(
        &self,
        user_id: Uuid,
        amount: Decimal,
        transaction_type: WalletTransactionType,
        payment_method: &str,
    ) -> Result<WalletTransaction>;

    /// Ledger entries for a user, newest first.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<WalletTransaction>>;
}

/// Storage contract for receipts. Write-once per trip.
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    async fn create(&self, receipt: Receipt) -> Result<Receipt>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Receipt>>;
    async fn find_by_trip(&self, trip_id: Uuid) -> Result<Option<Receipt>>;
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Receipt>>;
}
