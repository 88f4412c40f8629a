use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub reservation: ReservationSettings,
    pub fare: FareSettings,
    pub fleet: CollaboratorSettings,
    pub identity: CollaboratorSettings,
    pub gateway: GatewaySettings,
    pub settlement: SettlementSettings,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationSettings {
    pub port: u16,
    pub log_level: String,
    pub log_format: String,
}

#[derive(Debug, Deserialize)]
pub struct ReservationSettings {
    /// Length of the exclusive hold window in minutes.
    pub hold_minutes: i64,
    /// Interval between background expiry sweeps in seconds.
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct FareSettings {
    pub base_fee: Decimal,
    pub per_minute_rate: Decimal,
    pub currency: String,
    /// Battery percentage at or below which trips carry a low-battery advisory.
    pub low_battery_threshold: u8,
}

#[derive(Debug, Deserialize)]
pub struct CollaboratorSettings {
    pub base_url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct GatewaySettings {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct SettlementSettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub attempt_timeout_ms: u64,
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        builder.build()?.try_deserialize()
    }
}
