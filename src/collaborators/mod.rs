pub mod distance;
pub mod fleet;
pub mod identity;
pub mod payment_gateway;

pub use distance::{DistanceSource, SimulatedDistance};
pub use fleet::{FleetClient, HttpFleetClient, StaticFleet};
pub use identity::{HttpIdentityClient, IdentityClient, StaticIdentity};
pub use payment_gateway::{ChargeOutcome, HttpPaymentGateway, PaymentGateway};
