use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};
use uuid::Uuid;

use crate::collaborators::{ChargeOutcome, PaymentGateway};
use crate::config::SettlementSettings;
use crate::error::{AppError, Result};
use crate::models::{WalletTransaction, WalletTransactionType};
use crate::observability::{get_metrics, mask_sensitive, LatencyTimer};
use crate::repositories::WalletStore;

/// Retry policy for card charges.
///
/// These are operational knobs, not business rules; deployments tune them in
/// configuration.
#[derive(Debug, Clone)]
pub struct SettlementConfig {
    /// Total gateway calls allowed per settlement attempt.
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles each retry.
    pub base_delay_ms: u64,
    /// Hard deadline per gateway call; exceeding it counts as transient.
    pub attempt_timeout_ms: u64,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            attempt_timeout_ms: 5000,
        }
    }
}

impl From<&SettlementSettings> for SettlementConfig {
    fn from(settings: &SettlementSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            base_delay_ms: settings.base_delay_ms,
            attempt_timeout_ms: settings.attempt_timeout_ms,
        }
    }
}

/// How a trip charge was funded. Feeds the receipt.
#[derive(Debug, Clone)]
pub struct SettlementOutcome {
    pub total: Decimal,
    pub wallet_portion: Decimal,
    pub card_portion: Decimal,
    pub payment_method: String,
    pub payment_details: String,
    pub gateway_attempts: u32,
    /// The single TripCharge ledger entry written for this settlement.
    pub ledger_entry: WalletTransaction,
}

struct CardCharge {
    reference: String,
    card_suffix: String,
    attempts: u32,
}

/// Charges a trip's final cost: wallet first, card fallback with bounded
/// retries. Either the settlement fully succeeds (one ledger entry) or
/// nothing is charged.
pub struct SettlementService {
    wallet: Arc<dyn WalletStore>,
    gateway: Arc<dyn PaymentGateway>,
    config: SettlementConfig,
}

impl SettlementService {
    pub fn new(
        wallet: Arc<dyn WalletStore>,
        gateway: Arc<dyn PaymentGateway>,
        config: SettlementConfig,
    ) -> Self {
        Self {
            wallet,
            gateway,
            config,
        }
    }

    /// Settles `total` for the user.
    ///
    /// The card is charged before the wallet is debited, so a failed card
    /// charge leaves the ledger untouched and the caller can retry ending
    /// the trip.
    pub async fn settle_trip(&self, user_id: Uuid, total: Decimal) -> Result<SettlementOutcome> {
        if total <= Decimal::ZERO {
            return Err(AppError::Validation(format!(
                "settlement amount must be positive, got {}",
                total
            )));
        }

        let timer = LatencyTimer::new();
        let balance = self.wallet.balance(user_id).await?;
        let wallet_portion = balance.min(total);
        let card_portion = total - wallet_portion;

        let card = if card_portion > Decimal::ZERO {
            match self.charge_card_with_retry(user_id, card_portion).await {
                Ok(charge) => Some(charge),
                Err(e) => {
                    get_metrics().record_settlement_failed(e.code());
                    return Err(e);
                }
            }
        } else {
            None
        };

        let (payment_method, payment_details) = match &card {
            None => ("WALLET".to_string(), "wallet balance".to_string()),
            Some(charge) if wallet_portion == Decimal::ZERO => (
                "CARD".to_string(),
                format!("card ****{} ref {}", charge.card_suffix, charge.reference),
            ),
            Some(charge) => (
                "WALLET+CARD".to_string(),
                format!(
                    "wallet {} + card ****{} ref {}",
                    wallet_portion, charge.card_suffix, charge.reference
                ),
            ),
        };

        let ledger_entry = self
            .wallet
            .apply(
                user_id,
                -wallet_portion,
                WalletTransactionType::TripCharge,
                &payment_method,
            )
            .await?;

        let gateway_attempts = card.as_ref().map(|c| c.attempts).unwrap_or(0);
        info!(
            "settled {} for user {}: wallet {} / card {} ({} gateway calls)",
            total, user_id, wallet_portion, card_portion, gateway_attempts
        );
        get_metrics().record_settlement(&payment_method, timer.elapsed_ms());

        Ok(SettlementOutcome {
            total,
            wallet_portion,
            card_portion,
            payment_method,
            payment_details,
            gateway_attempts,
            ledger_entry,
        })
    }

    /// Card charge with capped attempts and exponential backoff. Only
    /// transient outcomes (including per-attempt timeouts and transport
    /// failures) are retried; a decline fails immediately.
    async fn charge_card_with_retry(&self, user_id: Uuid, amount: Decimal) -> Result<CardCharge> {
        let per_attempt = Duration::from_millis(self.config.attempt_timeout_ms);

        for attempt in 1..=self.config.max_attempts {
            if attempt > 1 {
                let delay = self.config.base_delay_ms * 2u64.pow(attempt.saturating_sub(2));
                sleep(Duration::from_millis(delay)).await;
            }
            get_metrics().record_gateway_attempt();

            match timeout(per_attempt, self.gateway.charge_card(user_id, amount)).await {
                Err(_) => {
                    warn!(
                        "card charge attempt {}/{} timed out after {}ms",
                        attempt, self.config.max_attempts, self.config.attempt_timeout_ms
                    );
                }
                Ok(Err(AppError::Gateway(reason))) => {
                    warn!(
                        "card charge attempt {}/{} failed in transport: {}",
                        attempt, self.config.max_attempts, reason
                    );
                }
                Ok(Err(e)) => return Err(e),
                Ok(Ok(ChargeOutcome::Approved {
                    reference,
                    card_suffix,
                })) => {
                    info!(
                        "card charge approved on attempt {} (ref {})",
                        attempt,
                        mask_sensitive(&reference, 3)
                    );
                    return Ok(CardCharge {
                        reference,
                        card_suffix,
                        attempts: attempt,
                    });
                }
                Ok(Ok(ChargeOutcome::TransientFailure { reason })) => {
                    warn!(
                        "card charge attempt {}/{} transiently failed: {}",
                        attempt, self.config.max_attempts, reason
                    );
                }
                Ok(Ok(ChargeOutcome::Declined { reason })) => {
                    return Err(AppError::PaymentFailed(format!("card declined: {}", reason)));
                }
            }
        }

        Err(AppError::PaymentFailed(format!(
            "card charge failed after {} attempts",
            self.config.max_attempts
        )))
    }

    /// Credits the wallet from an external payment method.
    pub async fn top_up(
        &self,
        user_id: Uuid,
        amount: Decimal,
        payment_method: &str,
    ) -> Result<WalletTransaction> {
        if amount <= Decimal::ZERO {
            return Err(AppError::Validation(format!(
                "top-up amount must be positive, got {}",
                amount
            )));
        }
        let entry = self
            .wallet
            .apply(user_id, amount, WalletTransactionType::TopUp, payment_method)
            .await?;
        info!("topped up {} for user {}", amount, user_id);
        Ok(entry)
    }

    pub async fn balance(&self, user_id: Uuid) -> Result<Decimal> {
        self.wallet.balance(user_id).await
    }

    pub async fn transactions(&self, user_id: Uuid) -> Result<Vec<WalletTransaction>> {
        self.wallet.list_by_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryWalletStore;
    use async_trait::async_trait;
    use mockall::mock;
    use mockall::predicate::eq;
    use rust_decimal_macros::dec;

    mock! {
        Gateway {}

        #[async_trait]
        impl PaymentGateway for Gateway {
            async fn charge_card(&self, user_id: Uuid, amount: Decimal) -> Result<ChargeOutcome>;
        }
    }

    fn fast_config() -> SettlementConfig {
        SettlementConfig {
            max_attempts: 3,
            base_delay_ms: 1,
            attempt_timeout_ms: 1000,
        }
    }

    fn service_with(
        wallet: Arc<InMemoryWalletStore>,
        gateway: MockGateway,
    ) -> SettlementService {
        SettlementService::new(wallet, Arc::new(gateway), fast_config())
    }

    #[tokio::test]
    async fn test_wallet_covers_cost_without_gateway_call() {
        let wallet = Arc::new(InMemoryWalletStore::new());
        let user = Uuid::new_v4();
        wallet
            .apply(user, dec!(50), WalletTransactionType::TopUp, "CARD ****1234")
            .await
            .unwrap();

        let mut gateway = MockGateway::new();
        gateway.expect_charge_card().times(0);

        let service = service_with(wallet.clone(), gateway);
        let outcome = service.settle_trip(user, dec!(35)).await.unwrap();

        assert_eq!(outcome.wallet_portion, dec!(35));
        assert_eq!(outcome.card_portion, dec!(0));
        assert_eq!(outcome.payment_method, "WALLET");
        assert_eq!(outcome.gateway_attempts, 0);
        assert_eq!(wallet.balance(user).await.unwrap(), dec!(15));
    }

    #[tokio::test]
    async fn test_card_covers_shortfall() {
        let wallet = Arc::new(InMemoryWalletStore::new());
        let user = Uuid::new_v4();
        wallet
            .apply(user, dec!(20), WalletTransactionType::TopUp, "CARD ****1234")
            .await
            .unwrap();

        let mut gateway = MockGateway::new();
        gateway
            .expect_charge_card()
            .with(eq(user), eq(dec!(15)))
            .times(1)
            .returning(|_, _| {
                Ok(ChargeOutcome::Approved {
                    reference: "ch_001".to_string(),
                    card_suffix: "1234".to_string(),
                })
            });

        let service = service_with(wallet.clone(), gateway);
        let outcome = service.settle_trip(user, dec!(35)).await.unwrap();

        assert_eq!(outcome.wallet_portion, dec!(20));
        assert_eq!(outcome.card_portion, dec!(15));
        assert_eq!(outcome.payment_method, "WALLET+CARD");
        assert_eq!(outcome.ledger_entry.amount, dec!(-20));
        assert_eq!(outcome.ledger_entry.balance_after, dec!(0));
        assert_eq!(wallet.balance(user).await.unwrap(), dec!(0));
    }

    #[tokio::test]
    async fn test_transient_failures_retried_until_success() {
        let wallet = Arc::new(InMemoryWalletStore::new());
        let user = Uuid::new_v4();

        let mut gateway = MockGateway::new();
        let mut calls = 0u32;
        gateway
            .expect_charge_card()
            .times(3)
            .returning(move |_, _| {
                calls += 1;
                if calls < 3 {
                    Ok(ChargeOutcome::TransientFailure {
                        reason: "gateway busy".to_string(),
                    })
                } else {
                    Ok(ChargeOutcome::Approved {
                        reference: "ch_002".to_string(),
                        card_suffix: "9876".to_string(),
                    })
                }
            });

        let service = service_with(wallet.clone(), gateway);
        let outcome = service.settle_trip(user, dec!(35)).await.unwrap();

        assert_eq!(outcome.gateway_attempts, 3);
        assert_eq!(outcome.payment_method, "CARD");
        assert_eq!(outcome.wallet_portion, dec!(0));
        // The zero-amount wallet entry still records the charge.
        assert_eq!(outcome.ledger_entry.amount, dec!(0));
    }

    #[tokio::test]
    async fn test_declined_card_fails_without_retry() {
        let wallet = Arc::new(InMemoryWalletStore::new());
        let user = Uuid::new_v4();

        let mut gateway = MockGateway::new();
        gateway.expect_charge_card().times(1).returning(|_, _| {
            Ok(ChargeOutcome::Declined {
                reason: "card expired".to_string(),
            })
        });

        let service = service_with(wallet.clone(), gateway);
        let err = service.settle_trip(user, dec!(35)).await.unwrap_err();

        assert!(matches!(err, AppError::PaymentFailed(_)));
        // No partial ledger state.
        assert!(wallet.list_by_user(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_retries_leave_ledger_untouched() {
        let wallet = Arc::new(InMemoryWalletStore::new());
        let user = Uuid::new_v4();
        wallet
            .apply(user, dec!(20), WalletTransactionType::TopUp, "CARD ****1234")
            .await
            .unwrap();

        let mut gateway = MockGateway::new();
        gateway.expect_charge_card().times(3).returning(|_, _| {
            Ok(ChargeOutcome::TransientFailure {
                reason: "gateway busy".to_string(),
            })
        });

        let service = service_with(wallet.clone(), gateway);
        let err = service.settle_trip(user, dec!(35)).await.unwrap_err();

        assert!(matches!(err, AppError::PaymentFailed(_)));
        assert_eq!(wallet.balance(user).await.unwrap(), dec!(20));
        assert_eq!(wallet.list_by_user(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_errors_count_as_transient() {
        let wallet = Arc::new(InMemoryWalletStore::new());
        let user = Uuid::new_v4();

        let mut gateway = MockGateway::new();
        let mut calls = 0u32;
        gateway
            .expect_charge_card()
            .times(2)
            .returning(move |_, _| {
                calls += 1;
                if calls == 1 {
                    Err(AppError::Gateway("connection reset".to_string()))
                } else {
                    Ok(ChargeOutcome::Approved {
                        reference: "ch_003".to_string(),
                        card_suffix: "4321".to_string(),
                    })
                }
            });

        let service = service_with(wallet, gateway);
        let outcome = service.settle_trip(user, dec!(10)).await.unwrap();
        assert_eq!(outcome.gateway_attempts, 2);
    }

    #[tokio::test]
    async fn test_top_up_validates_amount() {
        let wallet = Arc::new(InMemoryWalletStore::new());
        let gateway = MockGateway::new();
        let service = service_with(wallet, gateway);

        let err = service
            .top_up(Uuid::new_v4(), dec!(0), "CARD ****1234")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_default_config() {
        let config = SettlementConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.base_delay_ms, 100);
        assert_eq!(config.attempt_timeout_ms, 5000);
    }
}
