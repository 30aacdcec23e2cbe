//! Input validation for account administration
//!
//! Validated types for the descriptive fields and the opening balance of an
//! account. All fields are private to force validation through the public API.

use rust_decimal::Decimal;
use std::fmt;

/// Fixed scale of every persisted balance (`NUMERIC(15,2)`)
pub const BALANCE_SCALE: u32 = 2;

/// Largest balance representable by `NUMERIC(15,2)`
pub const MAX_BALANCE: Decimal = Decimal::from_parts(2_764_472_319, 232_830, 0, false, 2);

// ============================================================================
// Validation Errors
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid length for {field}: expected {min}-{max}, got {actual}")]
    InvalidLength {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("Balance must not be negative: got {0}")]
    NegativeBalance(Decimal),

    #[error("Balance {value} exceeds {max} decimal places")]
    PrecisionOverflow { value: Decimal, max: u32 },

    #[error("Balance {0} exceeds the storable maximum")]
    BalanceTooLarge(Decimal),
}

// ============================================================================
// AccountName
// ============================================================================

/// Validated account name, 3-100 characters after trimming
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountName(String);

impl AccountName {
    pub const MIN_LEN: usize = 3;
    pub const MAX_LEN: usize = 100;

    /// # Examples
    /// ```
    /// use benefit_transfer::account::validation::AccountName;
    ///
    /// let name = AccountName::new("Meal allowance").unwrap();
    /// assert_eq!(name.as_str(), "Meal allowance");
    ///
    /// assert!(AccountName::new("ab").is_err());
    /// ```
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        let len = name.chars().count();

        if !(Self::MIN_LEN..=Self::MAX_LEN).contains(&len) {
            return Err(ValidationError::InvalidLength {
                field: "name",
                min: Self::MIN_LEN,
                max: Self::MAX_LEN,
                actual: len,
            });
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for AccountName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// AccountDescription
// ============================================================================

/// Validated free-text description, at most 255 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountDescription(String);

impl AccountDescription {
    pub const MAX_LEN: usize = 255;

    pub fn new(description: &str) -> Result<Self, ValidationError> {
        let len = description.chars().count();
        if len > Self::MAX_LEN {
            return Err(ValidationError::InvalidLength {
                field: "description",
                min: 0,
                max: Self::MAX_LEN,
                actual: len,
            });
        }
        Ok(Self(description.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for AccountDescription {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Balance
// ============================================================================

/// Check that a balance can be stored as-is in a `NUMERIC(15,2)` column.
///
/// Rejects negatives, scales above [`BALANCE_SCALE`] (the column would round
/// silently) and magnitudes above [`MAX_BALANCE`]. The accepted value is
/// returned at [`BALANCE_SCALE`].
pub fn validate_balance(balance: Decimal) -> Result<Decimal, ValidationError> {
    if balance.is_sign_negative() && !balance.is_zero() {
        return Err(ValidationError::NegativeBalance(balance));
    }
    if balance.normalize().scale() > BALANCE_SCALE {
        return Err(ValidationError::PrecisionOverflow {
            value: balance,
            max: BALANCE_SCALE,
        });
    }
    if balance > MAX_BALANCE {
        return Err(ValidationError::BalanceTooLarge(balance));
    }
    let mut stored = balance;
    stored.rescale(BALANCE_SCALE);
    Ok(stored)
}
