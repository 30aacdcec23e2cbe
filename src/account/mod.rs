//! Account records
//!
//! The `Account` row, validated creation input, and field validation rules.

pub mod models;
pub mod validation;

pub use models::{Account, NewAccount};
pub use validation::{
    AccountDescription, AccountName, BALANCE_SCALE, MAX_BALANCE, ValidationError,
    validate_balance,
};
