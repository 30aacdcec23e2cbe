//! Transfer Executor
//!
//! Owns the unit-of-work boundary around [`TransferService`]: one
//! transaction per attempt, commit on success, roll back on any error, and
//! resubmit contention failures under a [`RetryPolicy`].

use tracing::{error, field, info, warn};

use super::error::TransferError;
use super::retry::RetryPolicy;
use super::service::TransferService;
use super::types::{TransferOutcome, TransferRequest};
use crate::config::TransferConfig;
use crate::store::TransactionBoundary;

pub struct TransferExecutor<B: TransactionBoundary> {
    boundary: B,
    service: TransferService,
    retry: RetryPolicy,
}

impl<B: TransactionBoundary> TransferExecutor<B> {
    pub fn new(boundary: B, service: TransferService, retry: RetryPolicy) -> Self {
        Self {
            boundary,
            service,
            retry,
        }
    }

    pub fn from_config(boundary: B, config: &TransferConfig) -> Self {
        Self::new(
            boundary,
            TransferService::new(config.mode),
            RetryPolicy::from_config(config),
        )
    }

    pub fn boundary(&self) -> &B {
        &self.boundary
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Run one transfer to completion.
    ///
    /// Only retriable errors are resubmitted; every attempt starts a fresh
    /// transaction and re-reads both balances. After the last attempt the
    /// last error is returned unchanged.
    pub async fn execute(&self, request: &TransferRequest) -> Result<TransferOutcome, TransferError> {
        // Reject bad input without opening a transaction
        if let Err(e) = request.validate() {
            info!(
                from_id = request.from_id.map(field::display),
                to_id = request.to_id.map(field::display),
                amount = request.amount.map(field::display),
                code = e.code(),
                error = %e,
                "Transfer rejected before begin"
            );
            return Err(e);
        }

        let max_attempts = self.retry.max_attempts();
        let mut attempt = 1;
        loop {
            match self.attempt(request).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_retriable() && attempt < max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        code = e.code(),
                        error = %e,
                        "Retrying transfer"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt(&self, request: &TransferRequest) -> Result<TransferOutcome, TransferError> {
        let mut tx = self.boundary.begin().await?;

        match self.service.transfer(&mut tx, request).await {
            Ok(outcome) => {
                self.boundary.commit(tx).await?;
                Ok(outcome)
            }
            Err(e) => {
                if let Err(rb) = self.boundary.rollback(tx).await {
                    // The transfer error is the one the caller needs
                    error!(error = %rb, "Rollback failed");
                }
                Err(e)
            }
        }
    }
}
