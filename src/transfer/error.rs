//! Transfer Error Types
//!
//! Every variant aborts the unit of work. Caller errors are final for the
//! given input; contention errors may succeed on resubmission.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::core_types::AccountId;
use crate::store::StoreError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransferError {
    // === Caller Errors ===
    #[error("Invalid transfer: {0}")]
    InvalidTransfer(String),

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error(
        "Insufficient balance in account {account_id}: balance {balance:.2}, requested {requested:.2}"
    )]
    InsufficientBalance {
        account_id: AccountId,
        balance: Decimal,
        requested: Decimal,
    },

    // === Contention (retriable) ===
    #[error("Timed out waiting for lock on account {0}")]
    LockTimeout(AccountId),

    #[error("Deadlock detected; transfer aborted")]
    Deadlock,

    #[error("Account {0} changed concurrently; transfer aborted")]
    Conflict(AccountId),

    // === System Errors ===
    #[error("Store error: {0}")]
    Store(String),
}

impl TransferError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        TransferError::InvalidTransfer(msg.into())
    }

    /// Stable error code for API responses and log queries
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::InvalidTransfer(_) => "INVALID_TRANSFER",
            TransferError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            TransferError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            TransferError::LockTimeout(_) => "LOCK_TIMEOUT",
            TransferError::Deadlock => "DEADLOCK",
            TransferError::Conflict(_) => "CONFLICT",
            TransferError::Store(_) => "STORE_ERROR",
        }
    }

    /// Whether resubmitting the same request, after backoff, may succeed
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            TransferError::LockTimeout(_) | TransferError::Deadlock | TransferError::Conflict(_)
        )
    }
}

impl From<StoreError> for TransferError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::LockTimeout(id) => TransferError::LockTimeout(id),
            StoreError::Deadlock => TransferError::Deadlock,
            StoreError::VersionConflict(id) => TransferError::Conflict(id),
            StoreError::NotFound(id) => TransferError::AccountNotFound(id),
            StoreError::Constraint(msg) => TransferError::Store(msg),
            StoreError::Database(e) => TransferError::Store(e.to_string()),
        }
    }
}
