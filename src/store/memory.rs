//! In-Memory Account Store
//!
//! Row-level exclusive locking without a database. Each row pairs a
//! `tokio::sync::Mutex<()>` latch (the row lock) with the last committed
//! snapshot. A unit of work holds owned latch guards plus its staged writes;
//! commit publishes the writes, drop discards them and releases the latches.

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, trace};

use super::{AccountRegistry, AccountStore, StoreError, TransactionBoundary};
use crate::account::{Account, NewAccount};
use crate::core_types::AccountId;

/// Default bound on a single lock wait
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

struct Row {
    latch: Arc<Mutex<()>>,
    committed: RwLock<Account>,
}

impl Row {
    fn new(account: Account) -> Self {
        Self {
            latch: Arc::new(Mutex::new(())),
            committed: RwLock::new(account),
        }
    }

    fn snapshot(&self) -> Account {
        self.committed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Caller must hold the latch
    fn publish(&self, account: Account) {
        *self
            .committed
            .write()
            .unwrap_or_else(PoisonError::into_inner) = account;
    }
}

struct Inner {
    rows: DashMap<AccountId, Arc<Row>>,
    next_id: AtomicI64,
    lock_timeout: Duration,
}

/// Shared in-memory store; clones share the same rows
#[derive(Clone)]
pub struct MemoryAccountStore {
    inner: Arc<Inner>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                rows: DashMap::new(),
                next_id: AtomicI64::new(1),
                lock_timeout,
            }),
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        self.inner.lock_timeout
    }

    // The DashMap shard guard is released before returning; never hold it
    // across an await.
    fn row(&self, id: AccountId) -> Option<Arc<Row>> {
        self.inner.rows.get(&id).map(|r| Arc::clone(r.value()))
    }

    async fn lock_row(&self, id: AccountId, row: &Row) -> Result<OwnedMutexGuard<()>, StoreError> {
        trace!(account_id = %id, "Waiting for row latch");
        tokio::time::timeout(self.inner.lock_timeout, Arc::clone(&row.latch).lock_owned())
            .await
            .map_err(|_| StoreError::LockTimeout(id))
    }
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

/// One unit of work against a [`MemoryAccountStore`]
pub struct MemoryUnitOfWork {
    store: MemoryAccountStore,
    held: HashMap<AccountId, (Arc<Row>, OwnedMutexGuard<()>)>,
    staged: HashMap<AccountId, Account>,
}

impl MemoryUnitOfWork {
    fn new(store: MemoryAccountStore) -> Self {
        Self {
            store,
            held: HashMap::new(),
            staged: HashMap::new(),
        }
    }

    /// Ids currently locked by this unit of work
    pub fn locked_ids(&self) -> Vec<AccountId> {
        let mut ids: Vec<_> = self.held.keys().copied().collect();
        ids.sort();
        ids
    }

    async fn acquire(&mut self, id: AccountId, row: Arc<Row>) -> Result<(), StoreError> {
        if self.held.contains_key(&id) {
            return Ok(());
        }
        let guard = self.store.lock_row(id, &row).await?;
        self.held.insert(id, (row, guard));
        Ok(())
    }

    fn commit_staged(mut self) {
        for (id, account) in self.staged.drain() {
            if let Some((row, _guard)) = self.held.get(&id) {
                row.publish(Account {
                    version: account.version + 1,
                    ..account
                });
            }
        }
        // latches released as `self.held` drops
    }
}

#[async_trait]
impl AccountStore for MemoryUnitOfWork {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load_for_update(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let Some(row) = self.store.row(id) else {
            return Ok(None);
        };
        self.acquire(id, Arc::clone(&row)).await?;

        Ok(Some(match self.staged.get(&id) {
            Some(staged) => staged.clone(),
            None => row.snapshot(),
        }))
    }

    async fn load(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        if let Some(staged) = self.staged.get(&id) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.store.row(id).map(|row| row.snapshot()))
    }

    async fn save(&mut self, account: &Account) -> Result<(), StoreError> {
        let id = account.id;
        let row = self.store.row(id).ok_or(StoreError::NotFound(id))?;
        self.acquire(id, Arc::clone(&row)).await?;

        // Latch held: the committed version cannot move under us
        let committed = row.snapshot();
        if committed.version != account.version {
            return Err(StoreError::VersionConflict(id));
        }
        if account.balance.is_sign_negative() && !account.balance.is_zero() {
            return Err(StoreError::Constraint(format!(
                "balance of account {} must be >= 0, got {}",
                id, account.balance
            )));
        }

        self.staged.insert(id, account.clone());
        Ok(())
    }
}

#[async_trait]
impl TransactionBoundary for MemoryAccountStore {
    type Tx = MemoryUnitOfWork;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        Ok(MemoryUnitOfWork::new(self.clone()))
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError> {
        tx.commit_staged();
        Ok(())
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError> {
        drop(tx);
        Ok(())
    }
}

#[async_trait]
impl AccountRegistry for MemoryAccountStore {
    async fn create(&self, account: &NewAccount) -> Result<Account, StoreError> {
        let id = AccountId::new(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        let record = Account {
            id,
            name: account.name().to_string(),
            description: account.description().map(str::to_string),
            balance: account.balance(),
            active: true,
            version: 0,
        };
        self.inner
            .rows
            .insert(id, Arc::new(Row::new(record.clone())));
        debug!(account_id = %id, balance = %record.balance, "Account created");
        Ok(record)
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.row(id).map(|row| row.snapshot()))
    }

    async fn set_active(&self, id: AccountId, active: bool) -> Result<Account, StoreError> {
        let row = self.row(id).ok_or(StoreError::NotFound(id))?;
        let _guard = self.lock_row(id, &row).await?;

        let mut account = row.snapshot();
        account.active = active;
        account.version += 1;
        row.publish(account.clone());
        debug!(account_id = %id, active, "Account activation changed");
        Ok(account)
    }

    async fn total_balance(&self, ids: &[AccountId]) -> Result<Decimal, StoreError> {
        // Each id counts once, matching `id = ANY($1)`
        let unique: BTreeSet<AccountId> = ids.iter().copied().collect();
        Ok(unique
            .into_iter()
            .filter_map(|id| self.row(id))
            .map(|row| row.snapshot().balance)
            .sum())
    }
}
