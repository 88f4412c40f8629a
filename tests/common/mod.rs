#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use ride_engine::collaborators::{
    ChargeOutcome, PaymentGateway, SimulatedDistance, StaticFleet, StaticIdentity,
};
use ride_engine::error::Result;
use ride_engine::fare::FareSchedule;
use ride_engine::models::{Coordinates, VehicleSnapshot, VehicleStatus};
use ride_engine::repositories::{
    InMemoryReceiptStore, InMemoryReservationStore, InMemoryTripStore, InMemoryWalletStore,
};
use ride_engine::services::{
    ReceiptService, ReservationService, SettlementConfig, SettlementService, TripService,
};

/// Gateway double that replays a scripted outcome sequence and counts calls.
/// Once the script is exhausted every further charge is approved.
pub struct ScriptedGateway {
    outcomes: Mutex<VecDeque<ChargeOutcome>>,
    calls: AtomicU32,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn script(&self, outcomes: impl IntoIterator<Item = ChargeOutcome>) {
        self.outcomes
            .lock()
            .expect("gateway lock poisoned")
            .extend(outcomes);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn charge_card(&self, _user_id: Uuid, _amount: Decimal) -> Result<ChargeOutcome> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let scripted = self
            .outcomes
            .lock()
            .expect("gateway lock poisoned")
            .pop_front();
        Ok(scripted.unwrap_or(ChargeOutcome::Approved {
            reference: format!("ch_{:04}", call),
            card_suffix: "4242".to_string(),
        }))
    }
}

pub fn transient(reason: &str) -> ChargeOutcome {
    ChargeOutcome::TransientFailure {
        reason: reason.to_string(),
    }
}

pub fn declined(reason: &str) -> ChargeOutcome {
    ChargeOutcome::Declined {
        reason: reason.to_string(),
    }
}

pub fn approved(reference: &str) -> ChargeOutcome {
    ChargeOutcome::Approved {
        reference: reference.to_string(),
        card_suffix: "4242".to_string(),
    }
}

/// The full engine wired over in-memory stores and scripted collaborators.
pub struct TestEngine {
    pub reservations: Arc<ReservationService>,
    pub trips: Arc<TripService>,
    pub settlement: Arc<SettlementService>,
    pub receipts: Arc<ReceiptService>,
    pub reservation_store: Arc<InMemoryReservationStore>,
    pub trip_store: Arc<InMemoryTripStore>,
    pub wallet_store: Arc<InMemoryWalletStore>,
    pub receipt_store: Arc<InMemoryReceiptStore>,
    pub fleet: Arc<StaticFleet>,
    pub identity: Arc<StaticIdentity>,
    pub gateway: Arc<ScriptedGateway>,
}

pub fn engine() -> TestEngine {
    let reservation_store = Arc::new(InMemoryReservationStore::new());
    let trip_store = Arc::new(InMemoryTripStore::new());
    let wallet_store = Arc::new(InMemoryWalletStore::new());
    let receipt_store = Arc::new(InMemoryReceiptStore::new());
    let fleet = Arc::new(StaticFleet::new());
    let identity = Arc::new(StaticIdentity::new());
    let gateway = Arc::new(ScriptedGateway::new());

    let reservations = Arc::new(ReservationService::new(
        reservation_store.clone(),
        fleet.clone(),
        identity.clone(),
        5,
    ));
    let settlement = Arc::new(SettlementService::new(
        wallet_store.clone(),
        gateway.clone(),
        SettlementConfig {
            max_attempts: 3,
            base_delay_ms: 1,
            attempt_timeout_ms: 1000,
        },
    ));
    let receipts = Arc::new(ReceiptService::new(receipt_store.clone(), "EUR"));
    let trips = Arc::new(TripService::new(
        trip_store.clone(),
        reservation_store.clone(),
        fleet.clone(),
        Arc::new(SimulatedDistance::default()),
        settlement.clone(),
        receipts.clone(),
        FareSchedule::default(),
        10,
    ));

    TestEngine {
        reservations,
        trips,
        settlement,
        receipts,
        reservation_store,
        trip_store,
        wallet_store,
        receipt_store,
        fleet,
        identity,
        gateway,
    }
}

impl TestEngine {
    /// Rewrites a trip's start time so fare tests control elapsed minutes.
    pub async fn backdate_trip(&self, trip_id: Uuid, minutes: i64) {
        use ride_engine::repositories::TripStore;

        let mut trip = self
            .trip_store
            .find_by_id(trip_id)
            .await
            .expect("store read")
            .expect("trip exists");
        trip.started_at = trip.started_at - chrono::Duration::minutes(minutes);
        self.trip_store.update(&trip).await.expect("store write");
    }

    /// Rewrites a reservation's expiry deadline to simulate elapsed time.
    pub async fn set_reservation_deadline(
        &self,
        reservation_id: Uuid,
        deadline: chrono::DateTime<chrono::Utc>,
    ) {
        use ride_engine::repositories::ReservationStore;

        let mut reservation = self
            .reservation_store
            .find_by_id(reservation_id)
            .await
            .expect("store read")
            .expect("reservation exists");
        reservation.expires_at = deadline;
        self.reservation_store
            .update(&reservation)
            .await
            .expect("store write");
    }

    pub fn register_user(&self) -> Uuid {
        let user_id = Uuid::new_v4();
        self.identity.insert(user_id);
        user_id
    }

    pub fn register_vehicle(&self) -> Uuid {
        self.register_vehicle_with_battery(85)
    }

    pub fn register_vehicle_with_battery(&self, battery_percent: u8) -> Uuid {
        let vehicle_id = Uuid::new_v4();
        self.fleet.insert(VehicleSnapshot {
            id: vehicle_id,
            code: format!("SC-{}", &vehicle_id.to_string()[..4]),
            status: VehicleStatus::Available,
            battery_percent,
            coordinates: Coordinates::new(52.52, 13.405),
        });
        vehicle_id
    }
}
