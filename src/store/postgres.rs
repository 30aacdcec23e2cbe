//! PostgreSQL Account Store
//!
//! Backed by `accounts_tb`. Row locks come from `SELECT ... FOR UPDATE` and
//! live until the surrounding transaction ends. Lock waits are bounded per
//! transaction with `SET LOCAL lock_timeout`.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;
use tracing::{debug, error};

use super::{AccountRegistry, AccountStore, StoreError, TransactionBoundary};
use crate::account::{Account, NewAccount};
use crate::core_types::AccountId;

const SELECT_ACCOUNT: &str =
    "SELECT id, name, description, balance, active, version FROM accounts_tb WHERE id = $1";

const SELECT_ACCOUNT_FOR_UPDATE: &str = "SELECT id, name, description, balance, active, version \
     FROM accounts_tb WHERE id = $1 FOR UPDATE";

/// Transaction boundary and registry over a PostgreSQL pool
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgAccountStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// `lock_timeout` value for `set_config`. PostgreSQL treats `0` as no
/// limit, so sub-millisecond timeouts are raised to 1ms.
fn lock_timeout_setting(timeout: Duration) -> String {
    format!("{}ms", timeout.as_millis().max(1))
}

/// One PostgreSQL transaction. Dropping it without commit rolls back.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AccountStore for PgUnitOfWork {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn load_for_update(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        sqlx::query_as::<_, Account>(SELECT_ACCOUNT_FOR_UPDATE)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| StoreError::from_sqlx(e, id))
    }

    async fn load(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        sqlx::query_as::<_, Account>(SELECT_ACCOUNT)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| StoreError::from_sqlx(e, id))
    }

    async fn save(&mut self, account: &Account) -> Result<(), StoreError> {
        // Under READ COMMITTED the WHERE clause is re-checked against the
        // latest committed row once any competing row lock is released.
        let result = sqlx::query(
            r#"
            UPDATE accounts_tb
            SET balance = $1, version = version + 1, updated_at = NOW()
            WHERE id = $2 AND version = $3
            "#,
        )
        .bind(account.balance)
        .bind(account.id)
        .bind(account.version)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| StoreError::from_sqlx(e, account.id))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::VersionConflict(account.id));
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionBoundary for PgAccountStore {
    type Tx = PgUnitOfWork;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let mut tx = self.pool.begin().await?;

        // is_local = true: scoped to this transaction only
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(lock_timeout_setting(self.lock_timeout))
            .execute(&mut *tx)
            .await?;

        Ok(PgUnitOfWork { tx })
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError> {
        tx.tx.commit().await.map_err(|e| {
            error!(error = %e, "Commit failed");
            StoreError::Database(e)
        })
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError> {
        tx.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl AccountRegistry for PgAccountStore {
    async fn create(&self, account: &NewAccount) -> Result<Account, StoreError> {
        let created = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts_tb (name, description, balance, active, version)
            VALUES ($1, $2, $3, TRUE, 0)
            RETURNING id, name, description, balance, active, version
            "#,
        )
        .bind(account.name())
        .bind(account.description())
        .bind(account.balance())
        .fetch_one(&self.pool)
        .await?;

        debug!(account_id = %created.id, balance = %created.balance, "Account created");
        Ok(created)
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(SELECT_ACCOUNT)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn set_active(&self, id: AccountId, active: bool) -> Result<Account, StoreError> {
        sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts_tb
            SET active = $1, version = version + 1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, name, description, balance, active, version
            "#,
        )
        .bind(active)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx(e, id))?
        .ok_or(StoreError::NotFound(id))
    }

    async fn total_balance(&self, ids: &[AccountId]) -> Result<Decimal, StoreError> {
        let raw: Vec<i64> = ids.iter().map(AccountId::get).collect();
        let total = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(balance), 0) FROM accounts_tb WHERE id = ANY($1)",
        )
        .bind(raw)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }
}
