use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::Trip;

/// Source of the final trip distance.
///
/// Real GPS trace ingestion is an external concern; the engine only needs a
/// deterministic figure to freeze into the receipt, so the source stays
/// swappable.
pub trait DistanceSource: Send + Sync {
    fn trip_distance_km(&self, trip: &Trip, ended_at: DateTime<Utc>) -> Decimal;
}

/// Derives distance from riding time at a nominal urban speed.
///
/// Deterministic: the same trip timestamps always produce the same distance.
pub struct SimulatedDistance {
    pub km_per_minute: Decimal,
}

impl Default for SimulatedDistance {
    fn default() -> Self {
        Self {
            // ~15 km/h nominal shared-vehicle speed.
            km_per_minute: Decimal::new(25, 2),
        }
    }
}

impl DistanceSource for SimulatedDistance {
    fn trip_distance_km(&self, trip: &Trip, ended_at: DateTime<Utc>) -> Decimal {
        let seconds = Decimal::from(trip.elapsed(ended_at).num_seconds().max(0));
        (seconds * self.km_per_minute / Decimal::from(60)).round_dp(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinates;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_simulated_distance_deterministic() {
        let trip = Trip::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "SC-0042".to_string(),
            Coordinates::new(52.52, 13.405),
        );
        let ended_at = trip.started_at + Duration::minutes(20);

        let source = SimulatedDistance::default();
        let first = source.trip_distance_km(&trip, ended_at);
        let second = source.trip_distance_km(&trip, ended_at);

        assert_eq!(first, second);
        assert_eq!(first, dec!(5.00));
    }

    #[test]
    fn test_zero_duration_zero_distance() {
        let trip = Trip::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "SC-0042".to_string(),
            Coordinates::new(52.52, 13.405),
        );
        let source = SimulatedDistance::default();
        assert_eq!(source.trip_distance_km(&trip, trip.started_at), dec!(0));
    }
}
