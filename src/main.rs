use std::sync::Arc;
use std::time::Duration;

use ride_engine::api::{create_router, AppState};
use ride_engine::collaborators::{
    HttpFleetClient, HttpIdentityClient, HttpPaymentGateway, SimulatedDistance,
};
use ride_engine::config::Settings;
use ride_engine::fare::FareSchedule;
use ride_engine::observability::{init_logging, init_metrics, LogConfig, LogFormat};
use ride_engine::repositories::{
    PgReceiptStore, PgReservationStore, PgTripStore, PgWalletStore,
};
use ride_engine::services::{
    ReceiptService, ReservationService, SettlementConfig, SettlementService, TripService,
};
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;

    // Initialize logging
    init_logging(&LogConfig {
        level: settings.application.log_level.clone(),
        format: LogFormat::from(settings.application.log_format.as_str()),
        ..LogConfig::default()
    });
    info!("Configuration loaded");

    // Initialize metrics
    let metrics_handle = init_metrics();

    // Connect to PostgreSQL
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(settings.database.pool_size)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&settings.database.url)
        .await?;
    info!("Database connection established");

    // Run migrations
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations applied successfully");

    // Stores
    let reservations = Arc::new(PgReservationStore::new(pool.clone()));
    let trips = Arc::new(PgTripStore::new(pool.clone()));
    let wallet = Arc::new(PgWalletStore::new(pool.clone()));
    let receipts = Arc::new(PgReceiptStore::new(pool.clone()));

    // Collaborators
    let fleet = Arc::new(HttpFleetClient::new(
        settings.fleet.base_url.clone(),
        settings.fleet.timeout_ms,
    )?);
    let identity = Arc::new(HttpIdentityClient::new(
        settings.identity.base_url.clone(),
        settings.identity.timeout_ms,
    )?);
    let gateway = Arc::new(HttpPaymentGateway::new(
        settings.gateway.base_url.clone(),
        settings.gateway.api_key.clone(),
    )?);
    let distance = Arc::new(SimulatedDistance::default());

    // Services
    let reservation_service = Arc::new(ReservationService::new(
        reservations.clone(),
        fleet.clone(),
        identity.clone(),
        settings.reservation.hold_minutes,
    ));
    let settlement_service = Arc::new(SettlementService::new(
        wallet.clone(),
        gateway.clone(),
        SettlementConfig::from(&settings.settlement),
    ));
    let receipt_service = Arc::new(ReceiptService::new(
        receipts.clone(),
        settings.fare.currency.clone(),
    ));
    let trip_service = Arc::new(TripService::new(
        trips.clone(),
        reservations.clone(),
        fleet.clone(),
        distance,
        settlement_service.clone(),
        receipt_service.clone(),
        FareSchedule::from(&settings.fare),
        settings.fare.low_battery_threshold,
    ));

    // Background sweep: persists Expired on stale holds so exclusivity
    // slots free up even when nobody reads them.
    let sweep_interval = settings.reservation.sweep_interval_secs;
    let sweeper = reservation_service.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(sweep_interval));
        loop {
            ticker.tick().await;
            if let Err(e) = sweeper.sweep_expired().await {
                error!("expiry sweep failed: {}", e);
            }
        }
    });
    info!("Expiry sweep running every {}s", sweep_interval);

    let state = AppState::new(
        reservation_service,
        trip_service,
        settlement_service,
        receipt_service,
    )
    .with_pool(pool)
    .with_metrics(metrics_handle);

    let app = create_router(state);
    let addr = format!("0.0.0.0:{}", settings.application.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
