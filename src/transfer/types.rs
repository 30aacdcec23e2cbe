//! Transfer Core Types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::TransferError;
use crate::account::BALANCE_SCALE;
use crate::core_types::{AccountId, TransferId};

/// Raw inbound request
///
/// Fields are optional because callers (CLI, JSON) may omit them; absence is
/// a validation failure, not a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from_id: Option<AccountId>,
    pub to_id: Option<AccountId>,
    pub amount: Option<Decimal>,
}

impl TransferRequest {
    pub fn new(from_id: AccountId, to_id: AccountId, amount: Decimal) -> Self {
        Self {
            from_id: Some(from_id),
            to_id: Some(to_id),
            amount: Some(amount),
        }
    }

    /// Stateless checks, run before any lock is requested
    ///
    /// # Order
    /// 1. all fields present
    /// 2. amount positive, and representable at the balance scale
    /// 3. distinct endpoints
    pub fn validate(&self) -> Result<ValidTransfer, TransferError> {
        let from = self
            .from_id
            .ok_or_else(|| TransferError::invalid("from_id required"))?;
        let to = self
            .to_id
            .ok_or_else(|| TransferError::invalid("to_id required"))?;
        let mut amount = self
            .amount
            .ok_or_else(|| TransferError::invalid("amount required"))?;

        if amount <= Decimal::ZERO {
            return Err(TransferError::invalid("amount must be positive"));
        }
        if amount.normalize().scale() > BALANCE_SCALE {
            return Err(TransferError::invalid(format!(
                "amount exceeds {} decimal places",
                BALANCE_SCALE
            )));
        }
        // 100, 100.0 and 100.000 all carry the column scale from here on
        amount.rescale(BALANCE_SCALE);

        if from == to {
            return Err(TransferError::invalid("cannot transfer to self"));
        }

        Ok(ValidTransfer { from, to, amount })
    }
}

/// A request that passed the stateless checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidTransfer {
    from: AccountId,
    to: AccountId,
    amount: Decimal,
}

impl ValidTransfer {
    pub fn from(&self) -> AccountId {
        self.from
    }

    pub fn to(&self) -> AccountId {
        self.to
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }
}

/// Result of a transfer that passed every check and was written
///
/// Balances are as saved; they become visible to others only once the
/// caller's unit of work commits.
#[derive(Debug, Clone, Serialize)]
pub struct TransferOutcome {
    pub transfer_id: TransferId,
    pub from_id: AccountId,
    pub to_id: AccountId,
    pub amount: Decimal,
    pub from_balance: Decimal,
    pub to_balance: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn invalid_msg(req: TransferRequest) -> String {
        match req.validate() {
            Err(TransferError::InvalidTransfer(msg)) => msg,
            other => panic!("expected InvalidTransfer, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_fields() {
        let full = TransferRequest::new(AccountId::new(1), AccountId::new(2), dec("1.00"));

        let mut req = full.clone();
        req.from_id = None;
        assert_eq!(invalid_msg(req), "from_id required");

        let mut req = full.clone();
        req.to_id = None;
        assert_eq!(invalid_msg(req), "to_id required");

        let mut req = full;
        req.amount = None;
        assert_eq!(invalid_msg(req), "amount required");

        // first missing field wins
        assert_eq!(invalid_msg(TransferRequest::default()), "from_id required");
    }

    #[test]
    fn test_non_positive_amount() {
        for amount in ["0", "0.00", "-100.00", "-0.01"] {
            let req = TransferRequest::new(AccountId::new(1), AccountId::new(2), dec(amount));
            assert_eq!(invalid_msg(req), "amount must be positive");
        }
    }

    #[test]
    fn test_amount_scale() {
        let req = TransferRequest::new(AccountId::new(1), AccountId::new(2), dec("0.001"));
        assert_eq!(invalid_msg(req), "amount exceeds 2 decimal places");

        let req = TransferRequest::new(AccountId::new(1), AccountId::new(2), dec("0.0100"));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_amount_carries_balance_scale() {
        for raw in ["100", "100.0", "100.000"] {
            let req = TransferRequest::new(AccountId::new(1), AccountId::new(2), dec(raw));
            let amount = req.validate().unwrap().amount();
            assert_eq!(amount.scale(), BALANCE_SCALE);
            assert_eq!(amount.to_string(), "100.00");
        }
    }

    #[test]
    fn test_self_transfer() {
        let req = TransferRequest::new(AccountId::new(1), AccountId::new(1), dec("100.00"));
        assert_eq!(invalid_msg(req), "cannot transfer to self");
    }

    #[test]
    fn test_amount_checked_before_endpoints() {
        let req = TransferRequest::new(AccountId::new(1), AccountId::new(1), dec("0"));
        assert_eq!(invalid_msg(req), "amount must be positive");
    }

    #[test]
    fn test_valid() {
        let req = TransferRequest::new(AccountId::new(2), AccountId::new(1), dec("300.00"));
        let valid = req.validate().unwrap();
        assert_eq!(valid.from(), AccountId::new(2));
        assert_eq!(valid.to(), AccountId::new(1));
        assert_eq!(valid.amount(), dec("300.00"));
    }

    #[test]
    fn test_request_from_json() {
        let req: TransferRequest =
            serde_json::from_str(r#"{"from_id": 1, "to_id": 2, "amount": "300.00"}"#).unwrap();
        assert_eq!(req.amount, Some(dec("300.00")));

        let req: TransferRequest = serde_json::from_str(r#"{"from_id": 1}"#).unwrap();
        assert_eq!(invalid_msg(req), "to_id required");
    }
}
