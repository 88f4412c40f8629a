use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of wallet ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "wallet_transaction_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletTransactionType {
    /// Funds added to the wallet from an external payment method.
    TopUp,
    /// Wallet portion of a trip settlement (amount ≤ 0).
    TripCharge,
}

/// One immutable wallet balance change.
///
/// Entries are append-only; `balance_after` must equal
/// `balance_before + amount` exactly, and the running balance never goes
/// negative.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Signed amount: positive credits, negative (or zero) debits.
    pub amount: Decimal,
    pub transaction_type: WalletTransactionType,
    /// Human-facing label of the funding source, e.g. `WALLET` or `CARD ****1234`.
    pub payment_method: String,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub created_at: DateTime<Utc>,
}

impl WalletTransaction {
    pub fn new(
        user_id: Uuid,
        amount: Decimal,
        transaction_type: WalletTransactionType,
        payment_method: impl Into<String>,
        balance_before: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            amount,
            transaction_type,
            payment_method: payment_method.into(),
            balance_before,
            balance_after: balance_before + amount,
            created_at: Utc::now(),
        }
    }

    /// Checks the ledger snapshot invariant.
    pub fn is_consistent(&self) -> bool {
        self.balance_after == self.balance_before + self.amount && self.balance_after >= Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_top_up_snapshot() {
        let tx = WalletTransaction::new(
            Uuid::new_v4(),
            dec!(50),
            WalletTransactionType::TopUp,
            "CARD ****1234",
            dec!(20),
        );
        assert_eq!(tx.balance_after, dec!(70));
        assert!(tx.is_consistent());
    }

    #[test]
    fn test_trip_charge_snapshot() {
        let tx = WalletTransaction::new(
            Uuid::new_v4(),
            dec!(-20),
            WalletTransactionType::TripCharge,
            "WALLET+CARD",
            dec!(20),
        );
        assert_eq!(tx.balance_after, dec!(0));
        assert!(tx.is_consistent());
    }

    #[test]
    fn test_zero_amount_charge_is_consistent() {
        // Card covered the whole fare; the ledger still records the charge.
        let tx = WalletTransaction::new(
            Uuid::new_v4(),
            dec!(0),
            WalletTransactionType::TripCharge,
            "CARD ****1234",
            dec!(0),
        );
        assert_eq!(tx.balance_after, dec!(0));
        assert!(tx.is_consistent());
    }

    #[test]
    fn test_negative_balance_is_inconsistent() {
        let mut tx = WalletTransaction::new(
            Uuid::new_v4(),
            dec!(-30),
            WalletTransactionType::TripCharge,
            "WALLET",
            dec!(20),
        );
        assert!(!tx.is_consistent());
        tx.balance_after = dec!(5);
        assert!(!tx.is_consistent());
    }
}
