pub mod coordinates;
pub mod receipt;
pub mod reservation;
pub mod trip;
pub mod vehicle;
pub mod wallet;

pub use coordinates::Coordinates;
pub use receipt::Receipt;
pub use reservation::{Reservation, ReservationStatus};
pub use trip::{Rating, Trip, TripStatus, MAX_RATING_COMMENT_LEN};
pub use vehicle::{VehicleSnapshot, VehicleStatus};
pub use wallet::{WalletTransaction, WalletTransactionType};
