use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::interest::{InterestLedger, OutflowSplit};
use crate::types::*;
use crate::FundResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Proceeds returned to partners. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub id: u64,
    pub amount: Money,
    pub distribution_type: String,
    pub issued_at: NaiveDate,
}

/// Fund-level waterfall aggregates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaterfallTotals {
    /// Catch-up the GP has earned but not yet been paid
    pub gp_catchup: Money,
    /// Everything ever allocated to limited partners
    pub lp_return: Money,
    /// Everything ever allocated to the general partner
    pub gp_return: Money,
}

/// Which branch of the waterfall settled the profit portion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaterfallBranch {
    /// Profit did not exceed outstanding catch-up; all of it went to the GP
    CatchUpOnly,
    /// Catch-up paid in full and the residual split by the carry rate
    CarrySplit,
}

/// Result for a single waterfall tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterfallTierResult {
    pub tier_name: String,
    /// Total amount distributed in this tier
    pub amount: Money,
    pub to_gp: Money,
    pub to_lp: Money,
    /// Proceeds remaining after this tier
    pub remaining: Money,
}

/// Full allocation of one distribution event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionOutcome {
    pub distribution_id: u64,
    pub amount: Money,
    pub capital_paid: Money,
    pub interest_paid: Money,
    /// Portion above capital and preferred return
    pub profit: Money,
    /// Catch-up earned by the GP from this event's preferred return
    pub catchup_accrued: Money,
    pub catchup_paid: Money,
    pub carried_interest: Money,
    pub to_lp: Money,
    pub to_gp: Money,
    pub branch: WaterfallBranch,
    /// Outstanding catch-up after this event
    pub gp_catchup_after: Money,
    pub tiers: Vec<WaterfallTierResult>,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Allocate one outflow split between LPs and the GP, updating `totals`.
///
/// LPs receive all returned capital and preferred return. Every unit of
/// preferred return paid earns the GP `carry_rate` of it as catch-up. Profit
/// above the ledger's cash flow first pays down outstanding catch-up; only
/// what is left is split by the carry rate. `to_lp + to_gp == amount`.
pub fn apply_waterfall(
    totals: &mut WaterfallTotals,
    split: &OutflowSplit,
    carry_rate: Rate,
) -> WaterfallAllocation {
    let lp_share = split.capital_paid + split.interest_paid;
    let profit = split.remaining;

    let catchup_accrued = if split.interest_paid > Decimal::ZERO {
        (split.interest_paid * carry_rate).floor()
    } else {
        Decimal::ZERO
    };
    totals.gp_catchup += catchup_accrued;

    if profit <= totals.gp_catchup {
        totals.gp_catchup -= profit;
        totals.lp_return += lp_share;
        totals.gp_return += profit;
        return WaterfallAllocation {
            catchup_accrued,
            catchup_paid: profit,
            carried_interest: Decimal::ZERO,
            to_lp: lp_share,
            to_gp: profit,
            branch: WaterfallBranch::CatchUpOnly,
        };
    }

    let catchup_paid = totals.gp_catchup;
    totals.gp_catchup = Decimal::ZERO;
    let residual = profit - catchup_paid;
    let carried_interest = (residual * carry_rate).floor();
    let to_gp = catchup_paid + carried_interest;
    let to_lp = lp_share + residual - carried_interest;
    totals.lp_return += to_lp;
    totals.gp_return += to_gp;

    WaterfallAllocation {
        catchup_accrued,
        catchup_paid,
        carried_interest,
        to_lp,
        to_gp,
        branch: WaterfallBranch::CarrySplit,
    }
}

/// Amounts produced by [`apply_waterfall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterfallAllocation {
    pub catchup_accrued: Money,
    pub catchup_paid: Money,
    pub carried_interest: Money,
    pub to_lp: Money,
    pub to_gp: Money,
    pub branch: WaterfallBranch,
}

fn tier_breakdown(split: &OutflowSplit, alloc: &WaterfallAllocation) -> Vec<WaterfallTierResult> {
    let mut remaining = split.capital_paid + split.interest_paid + split.remaining;
    let mut tier = |name: &str, to_gp: Money, to_lp: Money| {
        let amount = to_gp + to_lp;
        remaining -= amount;
        WaterfallTierResult {
            tier_name: name.to_string(),
            amount,
            to_gp,
            to_lp,
            remaining,
        }
    };

    let residual = split.remaining - alloc.catchup_paid;
    vec![
        tier("Return of Capital", Decimal::ZERO, split.capital_paid),
        tier("Preferred Return", Decimal::ZERO, split.interest_paid),
        tier("GP Catch-Up", alloc.catchup_paid, Decimal::ZERO),
        tier(
            "Carried Interest",
            alloc.carried_interest,
            residual - alloc.carried_interest,
        ),
    ]
}

// ---------------------------------------------------------------------------
// Waterfall
// ---------------------------------------------------------------------------

/// Distribution history and running GP/LP totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionWaterfall {
    carried_interest_rate: Rate,
    totals: WaterfallTotals,
    distributions: Vec<Distribution>,
    outcomes: Vec<DistributionOutcome>,
}

impl DistributionWaterfall {
    pub fn new(carried_interest_rate: Rate) -> Self {
        Self {
            carried_interest_rate,
            totals: WaterfallTotals::default(),
            distributions: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    pub fn totals(&self) -> &WaterfallTotals {
        &self.totals
    }

    pub fn distributions(&self) -> &[Distribution] {
        &self.distributions
    }

    pub fn outcomes(&self) -> &[DistributionOutcome] {
        &self.outcomes
    }

    /// Run one distribution event through the interest ledger and the waterfall.
    pub fn distribute(
        &mut self,
        ledger: &mut InterestLedger,
        amount: Money,
        distribution_type: &str,
        time: NaiveDate,
    ) -> FundResult<DistributionOutcome> {
        ensure_positive_amount("amount", amount)?;
        let split = ledger.record_outflow(amount, time)?;
        let alloc = apply_waterfall(&mut self.totals, &split, self.carried_interest_rate);

        debug_assert_eq!(alloc.to_lp + alloc.to_gp, amount);

        let id = self.distributions.len() as u64 + 1;
        self.distributions.push(Distribution {
            id,
            amount,
            distribution_type: distribution_type.to_string(),
            issued_at: time,
        });

        let outcome = DistributionOutcome {
            distribution_id: id,
            amount,
            capital_paid: split.capital_paid,
            interest_paid: split.interest_paid,
            profit: split.remaining,
            catchup_accrued: alloc.catchup_accrued,
            catchup_paid: alloc.catchup_paid,
            carried_interest: alloc.carried_interest,
            to_lp: alloc.to_lp,
            to_gp: alloc.to_gp,
            branch: alloc.branch,
            gp_catchup_after: self.totals.gp_catchup,
            tiers: tier_breakdown(&split, &alloc),
        };
        tracing::info!(
            distribution_id = id,
            %amount,
            to_lp = %outcome.to_lp,
            to_gp = %outcome.to_gp,
            branch = ?outcome.branch,
            gp_catchup = %outcome.gp_catchup_after,
            "distribution allocated"
        );
        self.outcomes.push(outcome.clone());
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FundConfig;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn funded_ledger() -> InterestLedger {
        let mut ledger = InterestLedger::new(&FundConfig::default());
        ledger.record_inflow(dec!(100000), d(2025, 1, 1)).unwrap();
        ledger
    }

    #[test]
    fn test_capital_only_distribution_goes_to_lps() {
        let mut ledger = funded_ledger();
        let mut wf = DistributionWaterfall::new(dec!(0.20));

        let out = wf
            .distribute(&mut ledger, dec!(10000), "exit", d(2025, 6, 1))
            .unwrap();
        assert_eq!(out.interest_paid, Decimal::ZERO);
        assert_eq!(out.to_lp, dec!(10000));
        assert_eq!(out.to_gp, Decimal::ZERO);
        assert_eq!(out.branch, WaterfallBranch::CatchUpOnly);
        assert_eq!(wf.totals().gp_catchup, Decimal::ZERO);
    }

    #[test]
    fn test_profit_pays_catchup_then_carry() {
        let mut ledger = funded_ledger();
        let mut wf = DistributionWaterfall::new(dec!(0.20));

        // Ledger holds 108,000 after one year; 42,000 is profit
        let out = wf
            .distribute(&mut ledger, dec!(150000), "exit", d(2026, 1, 1))
            .unwrap();
        assert_eq!(out.capital_paid, dec!(100000));
        assert_eq!(out.interest_paid, dec!(8000));
        assert_eq!(out.profit, dec!(42000));
        assert_eq!(out.catchup_accrued, dec!(1600));
        assert_eq!(out.catchup_paid, dec!(1600));
        assert_eq!(out.carried_interest, dec!(8080));
        assert_eq!(out.to_gp, dec!(9680));
        assert_eq!(out.to_lp, dec!(140320));
        assert_eq!(out.branch, WaterfallBranch::CarrySplit);
        assert_eq!(out.gp_catchup_after, Decimal::ZERO);
        assert_eq!(wf.totals().lp_return + wf.totals().gp_return, dec!(150000));

        let tiers = &out.tiers;
        assert_eq!(tiers.len(), 4);
        assert_eq!(tiers[0].amount, dec!(100000));
        assert_eq!(tiers[2].to_gp, dec!(1600));
        assert_eq!(tiers[3].remaining, Decimal::ZERO);
    }

    #[test]
    fn test_small_profit_is_all_catchup() {
        let mut ledger = funded_ledger();
        let mut wf = DistributionWaterfall::new(dec!(0.20));

        let out = wf
            .distribute(&mut ledger, dec!(109000), "exit", d(2026, 1, 1))
            .unwrap();
        assert_eq!(out.branch, WaterfallBranch::CatchUpOnly);
        assert_eq!(out.to_lp, dec!(108000));
        assert_eq!(out.to_gp, dec!(1000));
        assert_eq!(wf.totals().gp_catchup, dec!(600));

        // The ledger is empty, so the next distribution is pure profit
        let out = wf
            .distribute(&mut ledger, dec!(5000), "exit", d(2026, 1, 1))
            .unwrap();
        assert_eq!(out.catchup_paid, dec!(600));
        assert_eq!(out.carried_interest, dec!(880));
        assert_eq!(out.to_gp, dec!(1480));
        assert_eq!(out.to_lp, dec!(3520));
        assert_eq!(wf.totals().gp_catchup, Decimal::ZERO);
        assert_eq!(wf.totals().lp_return + wf.totals().gp_return, dec!(114000));
        assert_eq!(wf.distributions().len(), 2);
    }

    #[test]
    fn test_interest_without_profit_accrues_catchup() {
        let mut ledger = funded_ledger();
        let mut wf = DistributionWaterfall::new(dec!(0.20));

        let out = wf
            .distribute(&mut ledger, dec!(105000), "exit", d(2026, 1, 1))
            .unwrap();
        assert_eq!(out.interest_paid, dec!(5000));
        assert_eq!(out.to_lp, dec!(105000));
        assert_eq!(out.to_gp, Decimal::ZERO);
        assert_eq!(wf.totals().gp_catchup, dec!(1000));
    }

    #[test]
    fn test_apply_waterfall_balances() {
        let mut totals = WaterfallTotals {
            gp_catchup: dec!(37),
            ..WaterfallTotals::default()
        };
        let split = OutflowSplit {
            remaining: dec!(1001),
            capital_paid: dec!(333),
            interest_paid: dec!(77),
        };
        let alloc = apply_waterfall(&mut totals, &split, dec!(0.20));
        // 77 * 0.2 = 15.4 -> 15 more catch-up, 52 total paid first
        assert_eq!(alloc.catchup_accrued, dec!(15));
        assert_eq!(alloc.catchup_paid, dec!(52));
        assert_eq!(alloc.carried_interest, dec!(189));
        assert_eq!(alloc.to_lp + alloc.to_gp, dec!(1411));
        assert_eq!(totals.lp_return, alloc.to_lp);
        assert_eq!(totals.gp_return, alloc.to_gp);
    }

    #[test]
    fn test_failed_outflow_records_nothing() {
        let mut ledger = funded_ledger();
        let mut wf = DistributionWaterfall::new(dec!(0.20));
        assert!(wf
            .distribute(&mut ledger, dec!(100), "exit", d(2024, 1, 1))
            .is_err());
        assert!(wf.distributions().is_empty());
        assert_eq!(wf.totals(), &WaterfallTotals::default());
    }
}
