pub mod receipt_service;
pub mod reservation_service;
pub mod settlement_service;
pub mod trip_service;

pub use receipt_service::ReceiptService;
pub use reservation_service::ReservationService;
pub use settlement_service::{SettlementConfig, SettlementOutcome, SettlementService};
pub use trip_service::{TripQuote, TripService};
