//! Account Store
//!
//! Seams between the transfer protocol and the storage engine.
//!
//! # Unit of Work
//!
//! ```text
//! TransactionBoundary::begin() ──▶ Tx: AccountStore ──▶ commit(Tx) | rollback(Tx)
//!                                     │
//!                       load_for_update / load / save
//! ```
//!
//! A `Tx` is one unit of work. Every lock taken through it is held until it
//! is committed, rolled back, or dropped. Dropping a `Tx` rolls it back, so
//! cancelling an in-flight transfer releases its locks.
//!
//! # Implementations
//! - [`MemoryAccountStore`]: in-process rows with per-row latches
//! - [`PgAccountStore`]: PostgreSQL `accounts_tb` with `SELECT ... FOR UPDATE`

pub mod error;
pub mod memory;
pub mod postgres;

#[cfg(test)]
pub mod mock;

pub use error::StoreError;
pub use memory::{MemoryAccountStore, MemoryUnitOfWork};
pub use postgres::{PgAccountStore, PgUnitOfWork};

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::account::{Account, NewAccount};
use crate::core_types::AccountId;

/// Record access inside one unit of work
#[async_trait]
pub trait AccountStore: Send {
    /// Store name for logging
    fn name(&self) -> &'static str;

    /// Load a record and take an exclusive lock on it for the rest of the
    /// unit of work.
    ///
    /// Blocks until the lock is obtained or the store's lock timeout elapses
    /// ([`StoreError::LockTimeout`]). A missing record returns `Ok(None)` and
    /// locks nothing.
    async fn load_for_update(&mut self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Load the committed state of a record without locking it
    async fn load(&mut self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Write a record back.
    ///
    /// The write is conditional on `account.version` still being the stored
    /// version; otherwise [`StoreError::VersionConflict`]. The store bumps the
    /// version when the write lands.
    async fn save(&mut self, account: &Account) -> Result<(), StoreError>;
}

/// Caller-side transaction boundary
///
/// The transfer service never calls this; whoever invokes it owns the
/// begin/commit/rollback decisions.
#[async_trait]
pub trait TransactionBoundary: Send + Sync {
    type Tx: AccountStore + Send + 'static;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError>;

    async fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError>;
}

/// Administrative record operations, each in its own short transaction
#[async_trait]
pub trait AccountRegistry: Send + Sync {
    /// Insert a new active account; the store assigns the id
    async fn create(&self, account: &NewAccount) -> Result<Account, StoreError>;

    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Activate or deactivate an account (bumps the version)
    async fn set_active(&self, id: AccountId, active: bool) -> Result<Account, StoreError>;

    /// Sum of committed balances; missing ids contribute zero and repeated
    /// ids count once
    async fn total_balance(&self, ids: &[AccountId]) -> Result<Decimal, StoreError>;
}
