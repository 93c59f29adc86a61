use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::FundLedgerError;
use crate::types::{AccountId, Money, Rate};
use crate::FundResult;

/// Highest supported number of fixed-point decimals for pro-rata math.
pub const MAX_SCALE_DECIMALS: u32 = 18;

/// When accrued preferred return is folded into the compounding base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompoundingConvention {
    /// Re-base on every 1 January
    #[default]
    Annual,
    /// Re-base on 1 January, 1 April, 1 July and 1 October
    Quarterly,
}

/// Day-count basis used to turn an annual rate into a daily one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayCountConvention {
    #[default]
    Actual365Fixed,
    Actual360,
}

impl DayCountConvention {
    pub fn days_per_year(&self) -> Decimal {
        match self {
            DayCountConvention::Actual365Fixed => dec!(365),
            DayCountConvention::Actual360 => dec!(360),
        }
    }
}

/// Fund-wide parameters, fixed when the fund is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundConfig {
    /// LP commitments must be a multiple of this amount
    pub block_size: Money,
    /// Money per commitment/fund unit minted by the token layer
    pub unit_price: Money,
    /// Decimals of the fixed-point pro-rata denominator (scale = 10^n)
    pub scale_decimals: u32,
    /// Annual preferred return owed on deployed capital (0.08 = 8%)
    pub preferred_rate: Rate,
    /// GP share of catch-up accrual and residual profit (0.20 = 20%)
    pub carried_interest_rate: Rate,
    pub compounding: CompoundingConvention,
    pub day_count: DayCountConvention,
    /// Accounts that may act with administrator capability
    pub administrators: Vec<AccountId>,
}

impl Default for FundConfig {
    fn default() -> Self {
        Self {
            block_size: dec!(10000),
            unit_price: Decimal::ONE,
            scale_decimals: 8,
            preferred_rate: dec!(0.08),
            carried_interest_rate: dec!(0.20),
            compounding: CompoundingConvention::Annual,
            day_count: DayCountConvention::Actual365Fixed,
            administrators: Vec::new(),
        }
    }
}

impl FundConfig {
    /// Fixed-point denominator used by the pro-rata allocator.
    pub fn scale(&self) -> Decimal {
        Decimal::from(10u64.pow(self.scale_decimals))
    }

    pub fn validate(&self) -> FundResult<()> {
        if self.block_size <= Decimal::ZERO || !self.block_size.fract().is_zero() {
            return Err(FundLedgerError::InvalidInput {
                field: "block_size".into(),
                reason: "Block size must be a positive whole amount".into(),
            });
        }
        if self.unit_price <= Decimal::ZERO {
            return Err(FundLedgerError::InvalidInput {
                field: "unit_price".into(),
                reason: "Unit price must be positive".into(),
            });
        }
        if self.scale_decimals > MAX_SCALE_DECIMALS {
            return Err(FundLedgerError::InvalidInput {
                field: "scale_decimals".into(),
                reason: format!("Scale decimals cannot exceed {MAX_SCALE_DECIMALS}"),
            });
        }
        check_rate("preferred_rate", self.preferred_rate)?;
        check_rate("carried_interest_rate", self.carried_interest_rate)?;
        Ok(())
    }
}

fn check_rate(field: &str, rate: Rate) -> FundResult<()> {
    if rate < Decimal::ZERO || rate >= Decimal::ONE {
        return Err(FundLedgerError::InvalidInput {
            field: field.into(),
            reason: "Rate must be between 0 (inclusive) and 1 (exclusive)".into(),
        });
    }
    Ok(())
}
