//! Beneficio Transfer Service
//!
//! Atomic value transfers between Beneficio accounts on a relational store.
//!
//! # Modules
//!
//! - [`core_types`] - Identifiers (AccountId, TransferId)
//! - [`account`] - Account record, creation input, field validation
//! - [`store`] - Unit-of-work seams plus memory and PostgreSQL stores
//! - [`transfer`] - Transfer protocol, executor, retry policy
//! - [`db`] - Connection pool and schema
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing setup

// Core types - must be first!
pub mod core_types;

pub mod account;
pub mod config;
pub mod db;
pub mod logging;
pub mod store;
pub mod transfer;

// Convenient re-exports at crate root
pub use account::{Account, NewAccount, ValidationError};
pub use config::{AppConfig, ConcurrencyMode, TransferConfig};
pub use core_types::{AccountId, TransferId};
pub use store::{
    AccountRegistry, AccountStore, MemoryAccountStore, PgAccountStore, StoreError,
    TransactionBoundary,
};
pub use transfer::{
    RetryPolicy, TransferError, TransferExecutor, TransferOutcome, TransferRequest,
    TransferService,
};
