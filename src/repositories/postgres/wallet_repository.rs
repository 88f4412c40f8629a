use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{WalletTransaction, WalletTransactionType};
use crate::repositories::WalletStore;

/// Postgres-backed wallet ledger.
///
/// Balance mutation and ledger append happen in one transaction; the UPDATE
/// carries the non-negative guard so a losing race rolls back with nothing
/// written.
pub struct PgWalletStore {
    pool: PgPool,
}

impl PgWalletStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WalletStore for PgWalletStore {
    async fn balance(&self, user_id: Uuid) -> Result<Decimal> {
        let row: Option<(Decimal,)> = sqlx::query_as(
            r#"
            SELECT balance FROM wallet_accounts WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.map(|r| r.0).unwrap_or(Decimal::ZERO))
    }

    async fn apply(
        &self,
        user_id: Uuid,
        amount: Decimal,
        transaction_type: WalletTransactionType,
        payment_method: &str,
    ) -> Result<WalletTransaction> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        sqlx::query(
            r#"
            INSERT INTO wallet_accounts (user_id, balance)
            VALUES ($1, 0)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        let updated: Option<(Decimal,)> = sqlx::query_as(
            r#"
            UPDATE wallet_accounts
            SET balance = balance + $2
            WHERE user_id = $1 AND balance + $2 >= 0
            RETURNING balance
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        let balance_after = match updated {
            Some((balance,)) => balance,
            None => return Err(AppError::InsufficientFunds),
        };
        let balance_before = balance_after - amount;

        let entry = sqlx::query_as::<_, WalletTransaction>(
            r#"
            INSERT INTO wallet_transactions
                (id, user_id, amount, transaction_type, payment_method,
                 balance_before, balance_after, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, amount, transaction_type, payment_method,
                      balance_before, balance_after, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(amount)
        .bind(transaction_type)
        .bind(payment_method)
        .bind(balance_before)
        .bind(balance_after)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(entry)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<WalletTransaction>> {
        let rows = sqlx::query_as::<_, WalletTransaction>(
            r#"
            SELECT id, user_id, amount, transaction_type, payment_method,
                   balance_before, balance_after, created_at
            FROM wallet_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }
}
