//! Postgres store implementations on `sqlx`.
//!
//! Exclusivity is enforced by partial unique indexes over `status = 'ACTIVE'`
//! (see `migrations/`), so the check-then-insert unit the traits require is a
//! single INSERT whose unique-violation maps back to the typed business
//! error by constraint name.

pub mod receipt_repository;
pub mod reservation_repository;
pub mod trip_repository;
pub mod wallet_repository;

pub use receipt_repository::PgReceiptStore;
pub use reservation_repository::PgReservationStore;
pub use trip_repository::PgTripStore;
pub use wallet_repository::PgWalletStore;

/// Name of the violated constraint, if the error carries one.
pub(crate) fn constraint_name(err: &sqlx::Error) -> Option<String> {
    err.as_database_error()
        .and_then(|db| db.constraint())
        .map(|c| c.to_string())
}
