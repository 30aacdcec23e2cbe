//! Beneficio Transfers
//!
//! Moves value between two Beneficio accounts as a single atomic unit.
//!
//! # Architecture
//!
//! ```text
//! TransferExecutor ── begin ──▶ Tx ──▶ TransferService::transfer(&mut Tx) ──▶ commit | rollback
//!        │                                        │
//!        └── RetryPolicy (contention only)        └── validate, lock_pair, check, save
//! ```
//!
//! [`TransferService`] is the protocol and never touches the transaction
//! boundary. [`TransferExecutor`] is the caller that owns the boundary; any
//! other caller (an RPC handler, a batch job) can own it instead.
//!
//! # Concurrency Modes
//!
//! - **Pessimistic** (default): both rows locked in ascending id order before
//!   any balance is read.
//! - **Optimistic**: rows read unlocked, written conditioned on their version;
//!   a lost race surfaces as [`TransferError::Conflict`] and is retried.

pub mod error;
pub mod executor;
pub mod lock_order;
pub mod retry;
pub mod service;
pub mod types;

pub use error::TransferError;
pub use executor::TransferExecutor;
pub use lock_order::{LockedPair, load_pair, lock_order, lock_pair};
pub use retry::RetryPolicy;
pub use service::TransferService;
pub use types::{TransferOutcome, TransferRequest, ValidTransfer};
