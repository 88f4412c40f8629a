use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Coordinates;

/// Operational status of a vehicle as reported by the fleet service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    Available,
    Reserved,
    InUse,
    Maintenance,
}

impl VehicleStatus {
    /// Returns true if the vehicle can be offered for a new reservation.
    pub fn is_rentable(&self) -> bool {
        matches!(self, VehicleStatus::Available)
    }
}

/// Point-in-time view of a vehicle, owned by the fleet collaborator.
///
/// The engine never persists this; it reads it at reservation and trip
/// boundaries and derives advisory metadata (low battery) from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub id: Uuid,
    /// Short human-facing code printed on the vehicle.
    pub code: String,
    pub status: VehicleStatus,
    pub battery_percent: u8,
    pub coordinates: Coordinates,
}

impl VehicleSnapshot {
    /// Low battery is advisory metadata, never a transition trigger.
    pub fn is_low_battery(&self, threshold: u8) -> bool {
        self.battery_percent <= threshold
    }
}
