//! Deterministic lock ordering
//!
//! Two transfers A→B and B→A that lock "from, then to" can each hold one row
//! and wait on the other forever. Locking in ascending id order, regardless of
//! direction, gives every pair of transfers the same global order, so no such
//! cycle can form.

use crate::account::Account;
use crate::core_types::AccountId;
use crate::store::{AccountStore, StoreError};

/// The two ids of a transfer in acquisition order
#[inline]
pub fn lock_order(a: AccountId, b: AccountId) -> [AccountId; 2] {
    if a <= b { [a, b] } else { [b, a] }
}

/// Records loaded for one transfer, re-associated with their roles
#[derive(Debug)]
pub struct LockedPair {
    pub from: Option<Account>,
    pub to: Option<Account>,
}

/// Lock both records in ascending id order and hand them back as
/// (from, to). A missing record is returned as `None`; the caller decides
/// which error to raise.
pub async fn lock_pair<S>(
    store: &mut S,
    from: AccountId,
    to: AccountId,
) -> Result<LockedPair, StoreError>
where
    S: AccountStore + ?Sized,
{
    let [first, second] = lock_order(from, to);

    tracing::debug!(first = %first, second = %second, "Acquiring row locks");
    let first_rec = store.load_for_update(first).await?;
    let second_rec = store.load_for_update(second).await?;

    Ok(if first == from {
        LockedPair {
            from: first_rec,
            to: second_rec,
        }
    } else {
        LockedPair {
            from: second_rec,
            to: first_rec,
        }
    })
}

/// Unlocked counterpart of [`lock_pair`], used by the optimistic path
pub async fn load_pair<S>(
    store: &mut S,
    from: AccountId,
    to: AccountId,
) -> Result<LockedPair, StoreError>
where
    S: AccountStore + ?Sized,
{
    Ok(LockedPair {
        from: store.load(from).await?,
        to: store.load(to).await?,
    })
}
