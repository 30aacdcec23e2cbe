//! Account record and creation input

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use std::hash::{Hash, Hasher};

use super::validation::{AccountDescription, AccountName, ValidationError, validate_balance};
use crate::core_types::AccountId;

/// A benefit account as persisted in `accounts_tb`.
///
/// Identity is the `id` alone: two snapshots of the same row taken at
/// different versions compare equal.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub description: Option<String>,
    pub balance: Decimal,
    pub active: bool,
    /// Bumped by the store on every committed update
    pub version: i64,
}

impl Account {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn can_cover(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Account {}

impl Hash for Account {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Validated input for creating an account.
///
/// The store assigns `id`, starts `version` at 0 and marks the account active.
#[derive(Debug, Clone)]
pub struct NewAccount {
    name: AccountName,
    description: Option<AccountDescription>,
    balance: Decimal,
}

impl NewAccount {
    pub fn new(
        name: &str,
        description: Option<&str>,
        balance: Decimal,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            name: AccountName::new(name)?,
            description: description.map(AccountDescription::new).transpose()?,
            balance: validate_balance(balance)?,
        })
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_ref().map(AccountDescription::as_str)
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }
}
