use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::FareSettings;

/// Fixed per-deployment pricing constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareSchedule {
    pub base_fee: Decimal,
    pub per_minute_rate: Decimal,
}

impl Default for FareSchedule {
    fn default() -> Self {
        Self {
            base_fee: Decimal::from(5),
            per_minute_rate: Decimal::new(150, 2),
        }
    }
}

impl From<&FareSettings> for FareSchedule {
    fn from(settings: &FareSettings) -> Self {
        Self {
            base_fee: settings.base_fee,
            per_minute_rate: settings.per_minute_rate,
        }
    }
}

/// Itemized fare for a given riding time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareBreakdown {
    pub billable_minutes: i64,
    pub base_cost: Decimal,
    pub time_cost: Decimal,
    pub total_cost: Decimal,
}

impl FareSchedule {
    /// Elapsed time rounded up to the next whole minute, clamped at zero.
    pub fn billable_minutes(elapsed: Duration) -> i64 {
        let secs = elapsed.num_seconds().max(0);
        (secs + 59) / 60
    }

    /// Total fare for `elapsed` riding time.
    ///
    /// Pure and reproducible: the same start/end timestamps always yield the
    /// same cost, which is how a receipt is audited after the fact.
    pub fn cost(&self, elapsed: Duration) -> Decimal {
        self.breakdown(elapsed).total_cost
    }

    /// Itemized fare for `elapsed` riding time.
    pub fn breakdown(&self, elapsed: Duration) -> FareBreakdown {
        let minutes = Self::billable_minutes(elapsed);
        let time_cost = self.per_minute_rate * Decimal::from(minutes);
        FareBreakdown {
            billable_minutes: minutes,
            base_cost: self.base_fee,
            time_cost,
            total_cost: self.base_fee + time_cost,
        }
    }
}
