use std::time::Instant;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::capital_calls::{allocate_pro_rata, Participant, ProRataAllocation};
use crate::config::{FundConfig, MAX_SCALE_DECIMALS};
use crate::error::FundLedgerError;
use crate::interest::{InterestEntry, InterestLedger, OutflowSplit};
use crate::types::*;
use crate::FundResult;

// ---------------------------------------------------------------------------
// Allocation preview
// ---------------------------------------------------------------------------

/// Input for a stand-alone pro-rata allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationPreviewInput {
    /// Amount to draw
    pub amount: Money,
    /// Partners in processing order (GPs first by convention)
    pub participants: Vec<Participant>,
    /// Decimals of the fixed-point denominator
    #[serde(default = "default_scale_decimals")]
    pub scale_decimals: u32,
}

fn default_scale_decimals() -> u32 {
    FundConfig::default().scale_decimals
}

/// Split a draw across partners without touching any fund.
pub fn preview_allocation(
    input: &AllocationPreviewInput,
) -> FundResult<ComputationOutput<ProRataAllocation>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.participants.is_empty() {
        return Err(FundLedgerError::InvalidInput {
            field: "participants".into(),
            reason: "At least one participant is required".into(),
        });
    }
    if input.scale_decimals > MAX_SCALE_DECIMALS {
        return Err(FundLedgerError::InvalidInput {
            field: "scale_decimals".into(),
            reason: format!("Scale decimals cannot exceed {MAX_SCALE_DECIMALS}"),
        });
    }
    for p in &input.participants {
        ensure_positive_amount("participants.committed", p.committed)?;
    }

    let total_committed: Money = input.participants.iter().map(|p| p.committed).sum();
    if input.amount > total_committed {
        return Err(FundLedgerError::InsufficientCommitments {
            requested: input.amount,
            available: total_committed,
        });
    }

    let scale = Decimal::from(10u64.pow(input.scale_decimals));
    let allocation = allocate_pro_rata(input.amount, &input.participants, total_committed, scale)?;
    if !allocation.rounding_loss.is_zero() {
        warnings.push(format!(
            "{} units lost to rounding across {} partners",
            allocation.rounding_loss,
            allocation.allocations.len()
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Fixed-point pro-rata capital call allocation",
        &serde_json::json!({
            "amount": input.amount.to_string(),
            "total_committed": total_committed.to_string(),
            "scale_decimals": input.scale_decimals,
            "num_participants": input.participants.len(),
        }),
        warnings,
        elapsed,
        allocation,
    ))
}

// ---------------------------------------------------------------------------
// Preferred-return preview
// ---------------------------------------------------------------------------

/// Direction of a cash movement through the preferred-return ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowDirection {
    Inflow,
    Outflow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerFlow {
    pub date: NaiveDate,
    pub direction: FlowDirection,
    pub amount: Money,
}

/// Input for replaying cash flows through a stand-alone interest ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterestPreviewInput {
    #[serde(default)]
    pub config: FundConfig,
    pub flows: Vec<LedgerFlow>,
    /// Project the ledger forward to this date after the last flow
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowResult {
    pub date: NaiveDate,
    pub direction: FlowDirection,
    pub amount: Money,
    /// Set for outflows
    pub split: Option<OutflowSplit>,
    pub entry: InterestEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterestPreviewOutput {
    pub flows: Vec<FlowResult>,
    pub projected: Option<InterestEntry>,
    pub total_capital_paid: Money,
    pub total_interest_paid: Money,
    pub total_unabsorbed: Money,
}

/// Run inflows and outflows through a fresh preferred-return ledger.
pub fn preview_interest(
    input: &InterestPreviewInput,
) -> FundResult<ComputationOutput<InterestPreviewOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    input.config.validate()?;

    let mut ledger = InterestLedger::new(&input.config);
    let mut flows = Vec::with_capacity(input.flows.len());
    let mut total_capital_paid = Decimal::ZERO;
    let mut total_interest_paid = Decimal::ZERO;
    let mut total_unabsorbed = Decimal::ZERO;

    for flow in &input.flows {
        let split = match flow.direction {
            FlowDirection::Inflow => {
                ledger.record_inflow(flow.amount, flow.date)?;
                None
            }
            FlowDirection::Outflow => {
                let split = ledger.record_outflow(flow.amount, flow.date)?;
                total_capital_paid += split.capital_paid;
                total_interest_paid += split.interest_paid;
                if !split.remaining.is_zero() {
                    total_unabsorbed += split.remaining;
                    warnings.push(format!(
                        "Outflow of {} on {} exceeded the ledger by {}",
                        flow.amount, flow.date, split.remaining
                    ));
                }
                Some(split)
            }
        };
        let entry = ledger.project(flow.date)?;
        flows.push(FlowResult {
            date: flow.date,
            direction: flow.direction,
            amount: flow.amount,
            split,
            entry,
        });
    }

    let projected = input.as_of.map(|date| ledger.project(date)).transpose()?;

    let output = InterestPreviewOutput {
        flows,
        projected,
        total_capital_paid,
        total_interest_paid,
        total_unabsorbed,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Compounding preferred-return ledger",
        &serde_json::json!({
            "preferred_rate": input.config.preferred_rate.to_string(),
            "compounding": input.config.compounding,
            "day_count": input.config.day_count,
            "num_flows": input.flows.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_allocation_preview_warns_on_rounding() {
        let input = AllocationPreviewInput {
            amount: dec!(10000),
            participants: (0..3)
                .map(|i| Participant {
                    account: AccountId::from(format!("lp-{i}")),
                    role: PartnerRole::LimitedPartner,
                    committed: dec!(10000),
                })
                .collect(),
            scale_decimals: 8,
        };
        let out = preview_allocation(&input).unwrap();
        assert_eq!(out.result.rounding_loss, dec!(1));
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_allocation_preview_rejects_overdraw() {
        let input = AllocationPreviewInput {
            amount: dec!(20001),
            participants: vec![Participant {
                account: AccountId::from("lp"),
                role: PartnerRole::LimitedPartner,
                committed: dec!(20000),
            }],
            scale_decimals: 8,
        };
        assert!(matches!(
            preview_allocation(&input).unwrap_err(),
            FundLedgerError::InsufficientCommitments { .. }
        ));
    }

    #[test]
    fn test_interest_preview_totals() {
        let input = InterestPreviewInput {
            config: FundConfig::default(),
            flows: vec![
                LedgerFlow {
                    date: d(2025, 1, 1),
                    direction: FlowDirection::Inflow,
                    amount: dec!(100000),
                },
                LedgerFlow {
                    date: d(2026, 1, 1),
                    direction: FlowDirection::Outflow,
                    amount: dec!(110000),
                },
            ],
            as_of: Some(d(2027, 1, 1)),
        };
        let out = preview_interest(&input).unwrap();
        let result = &out.result;
        assert_eq!(result.total_capital_paid, dec!(100000));
        assert_eq!(result.total_interest_paid, dec!(8000));
        assert_eq!(result.total_unabsorbed, dec!(2000));
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(result.projected.as_ref().unwrap().total_cash_flow, Decimal::ZERO);
    }
}
