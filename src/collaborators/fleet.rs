use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::VehicleSnapshot;

/// Read-only view into the vehicle inventory service.
///
/// The engine consumes `{status, battery, code, coordinates}` at reservation
/// and trip boundaries; inventory and geolocation themselves live elsewhere.
#[async_trait]
pub trait FleetClient: Send + Sync {
    async fn vehicle(&self, vehicle_id: Uuid) -> Result<VehicleSnapshot>;
}

/// HTTP client for the fleet service.
pub struct HttpFleetClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpFleetClient {
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(anyhow!("failed to build fleet client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl FleetClient for HttpFleetClient {
    async fn vehicle(&self, vehicle_id: Uuid) -> Result<VehicleSnapshot> {
        let url = format!("{}/vehicles/{}", self.base_url, vehicle_id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow!("fleet request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!(
                "vehicle '{}' not found",
                vehicle_id
            )));
        }

        let response = response
            .error_for_status()
            .map_err(|e| AppError::Internal(anyhow!("fleet request failed: {}", e)))?;

        response
            .json::<VehicleSnapshot>()
            .await
            .map_err(|e| AppError::Internal(anyhow!("invalid fleet response: {}", e)))
    }
}

/// Fixed in-process fleet used by tests and local development.
#[derive(Default)]
pub struct StaticFleet {
    vehicles: RwLock<HashMap<Uuid, VehicleSnapshot>>,
}

impl StaticFleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, snapshot: VehicleSnapshot) {
        self.vehicles
            .write()
            .expect("fleet lock poisoned")
            .insert(snapshot.id, snapshot);
    }
}

#[async_trait]
impl FleetClient for StaticFleet {
    async fn vehicle(&self, vehicle_id: Uuid) -> Result<VehicleSnapshot> {
        self.vehicles
            .read()
            .expect("fleet lock poisoned")
            .get(&vehicle_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("vehicle '{}' not found", vehicle_id)))
    }
}
