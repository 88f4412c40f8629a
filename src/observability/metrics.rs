use metrics::{
    counter, describe_counter, describe_histogram, histogram, Unit,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Global metrics instance.
pub static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Metrics collector for the ride engine.
#[derive(Debug, Clone)]
pub struct Metrics {
    initialized: bool,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self { initialized: true }
    }

    pub fn record_reservation_created(&self) {
        counter!("ride_reservations_created_total").increment(1);
    }

    pub fn record_reservation_rejected(&self, reason: &str) {
        counter!("ride_reservations_rejected_total", "reason" => reason.to_string()).increment(1);
    }

    pub fn record_reservation_converted(&self) {
        counter!("ride_reservations_converted_total").increment(1);
    }

    pub fn record_reservations_expired(&self, count: u64) {
        counter!("ride_reservations_expired_total").increment(count);
    }

    pub fn record_trip_started(&self) {
        counter!("ride_trips_started_total").increment(1);
    }

    pub fn record_trip_completed(&self, billable_minutes: i64) {
        counter!("ride_trips_completed_total").increment(1);
        histogram!("ride_trip_billable_minutes").record(billable_minutes as f64);
    }

    pub fn record_trip_cancelled(&self) {
        counter!("ride_trips_cancelled_total").increment(1);
    }

    pub fn record_settlement(&self, payment_method: &str, duration_ms: f64) {
        counter!("ride_settlements_total", "method" => payment_method.to_string()).increment(1);
        histogram!("ride_settlement_duration_ms").record(duration_ms);
    }

    pub fn record_settlement_failed(&self, reason: &str) {
        counter!("ride_settlements_failed_total", "reason" => reason.to_string()).increment(1);
    }

    pub fn record_gateway_attempt(&self) {
        counter!("ride_gateway_charge_attempts_total").increment(1);
    }
}

/// Timer for measuring operation latency.
pub struct LatencyTimer {
    start: Instant,
}

impl LatencyTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for LatencyTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Initializes the metrics system and returns the Prometheus handle.
pub fn init_metrics() -> PrometheusHandle {
    let handle = METRICS_HANDLE.get_or_init(|| {
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .expect("Failed to install Prometheus recorder");

        describe_metrics();
        handle
    });

    METRICS.get_or_init(Metrics::new);

    handle.clone()
}

/// Describes all metrics for Prometheus.
fn describe_metrics() {
    describe_counter!("ride_reservations_created_total", Unit::Count, "Total reservations created");
    describe_counter!("ride_reservations_rejected_total", Unit::Count, "Total reservation attempts rejected");
    describe_counter!("ride_reservations_converted_total", Unit::Count, "Total reservations converted into trips");
    describe_counter!("ride_reservations_expired_total", Unit::Count, "Total reservations expired by the sweep");

    describe_counter!("ride_trips_started_total", Unit::Count, "Total trips started");
    describe_counter!("ride_trips_completed_total", Unit::Count, "Total trips completed");
    describe_counter!("ride_trips_cancelled_total", Unit::Count, "Total trips cancelled");
    describe_histogram!("ride_trip_billable_minutes", Unit::Count, "Billable minutes per completed trip");

    describe_counter!("ride_settlements_total", Unit::Count, "Total successful settlements by payment method");
    describe_counter!("ride_settlements_failed_total", Unit::Count, "Total failed settlements");
    describe_histogram!("ride_settlement_duration_ms", Unit::Milliseconds, "Settlement latency in milliseconds");
    describe_counter!("ride_gateway_charge_attempts_total", Unit::Count, "Total card gateway charge attempts");
}

/// Returns the global metrics instance.
pub fn get_metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}
