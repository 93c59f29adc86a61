use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::FundLedgerError;
use crate::FundResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.08 = 8%). Never as percentages.
pub type Rate = Decimal;

/// Ownership units minted and burned by the token layer.
pub type Units = Decimal;

/// Identifier of a partner account.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        AccountId(s.to_string())
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        AccountId(s)
    }
}

/// Role a partner holds in the fund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartnerRole {
    GeneralPartner,
    LimitedPartner,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

/// Ledger amounts are whole, non-negative units.
pub(crate) fn ensure_whole_amount(field: &str, value: Money) -> FundResult<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(FundLedgerError::InvalidInput {
            field: field.into(),
            reason: "Amount cannot be negative".into(),
        });
    }
    if !value.fract().is_zero() {
        return Err(FundLedgerError::InvalidInput {
            field: field.into(),
            reason: "Amount must be a whole number of units".into(),
        });
    }
    Ok(())
}

/// Same as [`ensure_whole_amount`] but also rejects zero.
pub(crate) fn ensure_positive_amount(field: &str, value: Money) -> FundResult<()> {
    ensure_whole_amount(field, value)?;
    if value.is_zero() {
        return Err(FundLedgerError::InvalidInput {
            field: field.into(),
            reason: "Amount must be positive".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_whole_amount_checks() {
        assert!(ensure_whole_amount("amount", dec!(0)).is_ok());
        assert!(ensure_whole_amount("amount", dec!(10000)).is_ok());
        assert!(ensure_whole_amount("amount", dec!(-1)).is_err());
        assert!(ensure_whole_amount("amount", dec!(1.5)).is_err());
        assert!(ensure_positive_amount("amount", dec!(0)).is_err());
    }

    #[test]
    fn test_account_id_serializes_as_string() {
        let id = AccountId::from("lp-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"lp-1\"");
        assert_eq!(id.to_string(), "lp-1");
    }
}
