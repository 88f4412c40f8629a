use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::services::{ReceiptService, ReservationService, SettlementService, TripService};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub reservations: Arc<ReservationService>,
    pub trips: Arc<TripService>,
    pub settlement: Arc<SettlementService>,
    pub receipts: Arc<ReceiptService>,
    /// Present when the engine runs on Postgres; health reporting only.
    pub pool: Option<PgPool>,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        reservations: Arc<ReservationService>,
        trips: Arc<TripService>,
        settlement: Arc<SettlementService>,
        receipts: Arc<ReceiptService>,
    ) -> Self {
        Self {
            reservations,
            trips,
            settlement,
            receipts,
            pool: None,
            metrics_handle: None,
        }
    }

    /// Adds the database pool for health reporting.
    pub fn with_pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Adds metrics handle to the state.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}

/// Creates the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        // Metrics endpoint
        .route("/metrics", get(handlers::metrics_endpoint))
        // Reservation endpoints
        .route("/reservations", post(handlers::create_reservation))
        .route("/reservations/current", get(handlers::get_current_reservation))
        .route("/reservations/:id", get(handlers::get_reservation))
        .route("/reservations/:id/cancel", post(handlers::cancel_reservation))
        .route("/reservations/:id/convert", post(handlers::convert_reservation))
        // Trip endpoints
        .route("/trips", get(handlers::list_trips))
        .route("/trips/:id", get(handlers::get_trip))
        .route("/trips/:id/quote", get(handlers::quote_trip))
        .route("/trips/:id/end", post(handlers::end_trip))
        .route("/trips/:id/cancel", post(handlers::cancel_trip))
        .route("/trips/:id/rating", post(handlers::rate_trip))
        .route("/trips/:id/receipt", get(handlers::get_trip_receipt))
        // Wallet endpoints
        .route("/wallet/balance", get(handlers::get_wallet_balance))
        .route("/wallet/top-up", post(handlers::top_up_wallet))
        .route("/wallet/transactions", get(handlers::list_wallet_transactions))
        // Receipt endpoints
        .route("/receipts", get(handlers::list_receipts))
        .route("/receipts/:id", get(handlers::get_receipt))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
