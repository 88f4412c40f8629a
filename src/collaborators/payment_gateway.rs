use anyhow::anyhow;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Outcome of a card charge attempt as classified by the gateway.
///
/// `TransientFailure` is retryable; `Declined` is terminal and must not be
/// retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeOutcome {
    Approved {
        /// Gateway charge reference.
        reference: String,
        /// Last four digits of the charged card.
        card_suffix: String,
    },
    TransientFailure {
        reason: String,
    },
    Declined {
        reason: String,
    },
}

/// External payment gateway contract.
///
/// Transport-level failures surface as [`AppError::Gateway`]; the settlement
/// process classifies those as retryable alongside `TransientFailure`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge_card(&self, user_id: Uuid, amount: Decimal) -> Result<ChargeOutcome>;
}

#[derive(Debug, Serialize)]
struct ChargeRequest {
    user_id: Uuid,
    amount: Decimal,
}

/// HTTP client for the card gateway.
///
/// No client-side timeout is configured here; the settlement retry loop
/// bounds every attempt and counts an elapsed deadline as transient.
pub struct HttpPaymentGateway {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpPaymentGateway {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Internal(anyhow!("failed to build gateway client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn charge_card(&self, user_id: Uuid, amount: Decimal) -> Result<ChargeOutcome> {
        let url = format!("{}/charges", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&ChargeRequest { user_id, amount })
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("charge request failed: {}", e)))?;

        if response.status().is_server_error() {
            return Err(AppError::Gateway(format!(
                "gateway returned {}",
                response.status()
            )));
        }

        response
            .json::<ChargeOutcome>()
            .await
            .map_err(|e| AppError::Gateway(format!("invalid gateway response: {}", e)))
    }
}
