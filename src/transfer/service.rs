//! Transfer Service
//!
//! Moves an amount between two accounts inside one caller-supplied unit of
//! work.
//!
//! # Protocol
//!
//! ```text
//! validate ─▶ lock (ascending id) ─▶ exist? ─▶ active? ─▶ covers? ─▶ mutate ─▶ save (ascending id)
//!    │             │                   │          │          │                      │
//!    └─────────────┴───────── any Err: caller rolls back, nothing persisted ────────┘
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Check-under-lock**: the sufficiency check reads the source balance only
//!    after its row lock is held (pessimistic) or is re-validated by a
//!    version-conditioned write (optimistic).
//! 2. **Global lock order**: rows are locked and written in ascending id
//!    order, never in from/to order.
//! 3. **No internal retry**: every error is returned as-is; retry policy
//!    belongs to the caller.
//! 4. **No boundary control**: the service never begins, commits or rolls
//!    back; it only reads and writes through the store it is handed.

use rust_decimal::Decimal;
use tracing::{debug, field, info, warn};

use super::error::TransferError;
use super::lock_order::{LockedPair, load_pair, lock_order, lock_pair};
use super::types::{TransferOutcome, TransferRequest, ValidTransfer};
use crate::account::{Account, MAX_BALANCE};
use crate::config::ConcurrencyMode;
use crate::core_types::{AccountId, TransferId};
use crate::store::AccountStore;

/// Stateless transfer service; one instance can serve any number of
/// concurrent callers, each with its own unit of work.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferService {
    mode: ConcurrencyMode,
}

impl TransferService {
    pub fn new(mode: ConcurrencyMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ConcurrencyMode {
        self.mode
    }

    /// Validate, lock, check and move `amount` from `from_id` to `to_id`.
    ///
    /// Must be called inside exactly one unit of work (`store`). On `Ok` the
    /// caller commits; on `Err` the caller rolls back, and no write made here
    /// may be kept.
    ///
    /// # Errors
    /// * `InvalidTransfer` - missing field, non-positive amount, self transfer,
    ///   inactive account, or a credit that would exceed the storable maximum
    /// * `AccountNotFound` - source checked before destination
    /// * `InsufficientBalance` - source balance below `amount`
    /// * `LockTimeout` / `Deadlock` / `Conflict` - contention, retriable
    /// * `Store` - anything else the store reported
    pub async fn transfer<S>(
        &self,
        store: &mut S,
        request: &TransferRequest,
    ) -> Result<TransferOutcome, TransferError>
    where
        S: AccountStore + ?Sized,
    {
        let transfer_id = TransferId::new();
        info!(
            transfer_id = %transfer_id,
            from_id = request.from_id.map(field::display),
            to_id = request.to_id.map(field::display),
            amount = request.amount.map(field::display),
            mode = ?self.mode,
            store = store.name(),
            "Transfer started"
        );

        let result = match request.validate() {
            Ok(valid) => self.execute(store, transfer_id, valid).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(outcome) => info!(
                transfer_id = %transfer_id,
                from_id = %outcome.from_id,
                to_id = %outcome.to_id,
                amount = %outcome.amount,
                from_balance = %outcome.from_balance,
                to_balance = %outcome.to_balance,
                "Transfer completed"
            ),
            Err(e) if e.is_retriable() => warn!(
                transfer_id = %transfer_id,
                code = e.code(),
                error = %e,
                "Transfer aborted by contention"
            ),
            Err(e) => debug!(
                transfer_id = %transfer_id,
                code = e.code(),
                error = %e,
                "Transfer rejected"
            ),
        }

        result
    }

    async fn execute<S>(
        &self,
        store: &mut S,
        transfer_id: TransferId,
        valid: ValidTransfer,
    ) -> Result<TransferOutcome, TransferError>
    where
        S: AccountStore + ?Sized,
    {
        let (from_id, to_id, amount) = (valid.from(), valid.to(), valid.amount());

        let LockedPair { from, to } = match self.mode {
            ConcurrencyMode::Pessimistic => lock_pair(store, from_id, to_id).await?,
            ConcurrencyMode::Optimistic => load_pair(store, from_id, to_id).await?,
        };

        let mut from = from.ok_or(TransferError::AccountNotFound(from_id))?;
        let mut to = to.ok_or(TransferError::AccountNotFound(to_id))?;

        ensure_active(&from)?;
        ensure_active(&to)?;

        if !from.can_cover(amount) {
            return Err(TransferError::InsufficientBalance {
                account_id: from_id,
                balance: from.balance,
                requested: amount,
            });
        }

        let (from_balance, to_balance) = apply(&from, &to, amount)?;
        from.balance = from_balance;
        to.balance = to_balance;

        for id in lock_order(from_id, to_id) {
            let record = if id == from_id { &from } else { &to };
            store.save(record).await?;
        }

        Ok(TransferOutcome {
            transfer_id,
            from_id,
            to_id,
            amount,
            from_balance,
            to_balance,
        })
    }
}

fn ensure_active(account: &Account) -> Result<(), TransferError> {
    if account.is_active() {
        Ok(())
    } else {
        Err(TransferError::invalid(format!(
            "account {} is inactive",
            account.id
        )))
    }
}

/// New (from, to) balances. Exact decimal arithmetic; any overflow or a
/// credit beyond the column's range is rejected instead of rounded.
fn apply(from: &Account, to: &Account, amount: Decimal) -> Result<(Decimal, Decimal), TransferError> {
    let from_balance = from
        .balance
        .checked_sub(amount)
        .filter(|b| !b.is_sign_negative() || b.is_zero())
        .ok_or(TransferError::InsufficientBalance {
            account_id: from.id,
            balance: from.balance,
            requested: amount,
        })?;

    let to_balance = to
        .balance
        .checked_add(amount)
        .filter(|b| *b <= MAX_BALANCE)
        .ok_or_else(|| credit_overflow(to.id))?;

    Ok((from_balance, to_balance))
}

fn credit_overflow(id: AccountId) -> TransferError {
    TransferError::invalid(format!(
        "account {} balance would exceed {}",
        id, MAX_BALANCE
    ))
}
