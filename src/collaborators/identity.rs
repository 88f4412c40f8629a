use std::collections::HashSet;
use std::sync::RwLock;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Confirms that a user exists and the account is active.
///
/// Credentials, sessions and OTP belong to the identity service; the engine
/// only gates state transitions on account existence.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    async fn verify_user(&self, user_id: Uuid) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct UserStatusResponse {
    active: bool,
}

/// HTTP client for the identity service.
pub struct HttpIdentityClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpIdentityClient {
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(anyhow!("failed to build identity client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl IdentityClient for HttpIdentityClient {
    async fn verify_user(&self, user_id: Uuid) -> Result<()> {
        let url = format!("{}/users/{}", self.base_url, user_id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow!("identity request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("user '{}' not found", user_id)));
        }

        let status = response
            .error_for_status()
            .map_err(|e| AppError::Internal(anyhow!("identity request failed: {}", e)))?
            .json::<UserStatusResponse>()
            .await
            .map_err(|e| AppError::Internal(anyhow!("invalid identity response: {}", e)))?;

        if !status.active {
            return Err(AppError::NotFound(format!(
                "user '{}' is not active",
                user_id
            )));
        }

        Ok(())
    }
}

/// Fixed in-process identity directory used by tests and local development.
#[derive(Default)]
pub struct StaticIdentity {
    users: RwLock<HashSet<Uuid>>,
}

impl StaticIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().collect()),
        }
    }

    pub fn insert(&self, user_id: Uuid) {
        self.users
            .write()
            .expect("identity lock poisoned")
            .insert(user_id);
    }
}

#[async_trait]
impl IdentityClient for StaticIdentity {
    async fn verify_user(&self, user_id: Uuid) -> Result<()> {
        if self
            .users
            .read()
            .expect("identity lock poisoned")
            .contains(&user_id)
        {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("user '{}' not found", user_id)))
        }
    }
}
