//! Mock store for testing
//!
//! Records every call so tests can assert which rows were locked, in what
//! order, and whether anything was written.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;

use super::{AccountStore, StoreError};
use crate::account::Account;
use crate::core_types::AccountId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    LoadForUpdate(AccountId),
    Load(AccountId),
    Save(AccountId),
}

#[derive(Default)]
pub struct MockStore {
    accounts: HashMap<AccountId, Account>,
    calls: Vec<StoreCall>,
    saved: Vec<Account>,
    /// Configured behavior
    lock_timeout_on: Option<AccountId>,
    deadlock_on_lock: Option<AccountId>,
    conflict_on_save: Option<AccountId>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: i64, balance: Decimal, active: bool) {
        let id = AccountId::new(id);
        self.accounts.insert(
            id,
            Account {
                id,
                name: format!("Beneficio {}", id),
                description: None,
                balance,
                active,
                version: 0,
            },
        );
    }

    pub fn set_lock_timeout_on(&mut self, id: i64) {
        self.lock_timeout_on = Some(AccountId::new(id));
    }

    pub fn set_deadlock_on_lock(&mut self, id: i64) {
        self.deadlock_on_lock = Some(AccountId::new(id));
    }

    pub fn set_conflict_on_save(&mut self, id: i64) {
        self.conflict_on_save = Some(AccountId::new(id));
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.clone()
    }

    pub fn lock_calls(&self) -> Vec<AccountId> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                StoreCall::LoadForUpdate(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn saved(&self) -> &[Account] {
        &self.saved
    }

    pub fn balance(&self, id: i64) -> Decimal {
        self.accounts[&AccountId::new(id)].balance
    }
}

#[async_trait]
impl AccountStore for MockStore {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn load_for_update(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.calls.push(StoreCall::LoadForUpdate(id));
        if self.lock_timeout_on == Some(id) {
            return Err(StoreError::LockTimeout(id));
        }
        if self.deadlock_on_lock == Some(id) {
            return Err(StoreError::Deadlock);
        }
        Ok(self.accounts.get(&id).cloned())
    }

    async fn load(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.calls.push(StoreCall::Load(id));
        Ok(self.accounts.get(&id).cloned())
    }

    async fn save(&mut self, account: &Account) -> Result<(), StoreError> {
        self.calls.push(StoreCall::Save(account.id));
        if self.conflict_on_save == Some(account.id) {
            return Err(StoreError::VersionConflict(account.id));
        }
        self.saved.push(account.clone());
        self.accounts.insert(
            account.id,
            Account {
                version: account.version + 1,
                ..account.clone()
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_calls() {
        let mut store = MockStore::new();
        store.insert(1, Decimal::new(1000, 0), true);

        let account = store.load_for_update(AccountId::new(1)).await.unwrap().unwrap();
        store.save(&account).await.unwrap();

        assert_eq!(
            store.calls(),
            vec![
                StoreCall::LoadForUpdate(AccountId::new(1)),
                StoreCall::Save(AccountId::new(1)),
            ]
        );
        assert_eq!(store.saved().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_injected_failures() {
        let mut store = MockStore::new();
        store.insert(1, Decimal::new(1000, 0), true);
        store.set_lock_timeout_on(1);

        let result = store.load_for_update(AccountId::new(1)).await;
        assert!(matches!(result, Err(StoreError::LockTimeout(_))));
    }
}
