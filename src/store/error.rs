//! Store Error Types

use thiserror::Error;

use crate::core_types::AccountId;

/// PostgreSQL SQLSTATE codes the store translates into typed errors
pub mod sqlstate {
    /// `lock_not_available`, raised when `lock_timeout` elapses
    pub const LOCK_NOT_AVAILABLE: &str = "55P03";
    pub const DEADLOCK_DETECTED: &str = "40P01";
    pub const SERIALIZATION_FAILURE: &str = "40001";
    pub const CHECK_VIOLATION: &str = "23514";
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Timed out waiting for lock on account {0}")]
    LockTimeout(AccountId),

    #[error("Deadlock detected by the store")]
    Deadlock,

    #[error("Account {0} was modified concurrently (version mismatch)")]
    VersionConflict(AccountId),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Account {0} not found")]
    NotFound(AccountId),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Translate a driver error raised while working on `id`.
    ///
    /// Lock and deadlock failures become their own variants so callers can
    /// tell contention apart from real failures.
    pub fn from_sqlx(err: sqlx::Error, id: AccountId) -> Self {
        let code = match &err {
            sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
            _ => None,
        };

        match code.as_deref() {
            Some(sqlstate::LOCK_NOT_AVAILABLE) => StoreError::LockTimeout(id),
            Some(sqlstate::DEADLOCK_DETECTED) => StoreError::Deadlock,
            Some(sqlstate::SERIALIZATION_FAILURE) => StoreError::VersionConflict(id),
            Some(sqlstate::CHECK_VIOLATION) => StoreError::Constraint(err.to_string()),
            _ => StoreError::Database(err),
        }
    }

    /// Whether retrying the whole unit of work may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::LockTimeout(_) | StoreError::Deadlock | StoreError::VersionConflict(_)
        )
    }
}
