use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::calendar::{days_between, next_boundary};
use crate::config::{CompoundingConvention, DayCountConvention, FundConfig};
use crate::error::FundLedgerError;
use crate::types::*;
use crate::FundResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Snapshot of deployed capital and the preferred return owed on it.
///
/// `total_cash_flow` is capital plus accrued-but-unpaid preferred return and
/// is never below `capital`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestEntry {
    pub timestamp: NaiveDate,
    /// Outstanding principal
    pub capital: Money,
    /// Preferred return accruing per day at the current total cash flow
    pub daily_rate: Money,
    /// Capital plus accrued unpaid preferred return
    pub total_cash_flow: Money,
}

impl InterestEntry {
    fn empty(timestamp: NaiveDate) -> Self {
        Self {
            timestamp,
            capital: Decimal::ZERO,
            daily_rate: Decimal::ZERO,
            total_cash_flow: Decimal::ZERO,
        }
    }

    /// Preferred return accrued and not yet paid.
    pub fn accrued_interest(&self) -> Money {
        self.total_cash_flow - self.capital
    }
}

/// How an outflow was absorbed by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutflowSplit {
    /// Part of the outflow above everything the ledger held
    pub remaining: Money,
    pub capital_paid: Money,
    pub interest_paid: Money,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Append-only ledger of capital and preferred-return snapshots.
///
/// Every inflow or outflow first catches the ledger up to the event date,
/// compounding at each period boundary crossed, then re-bases capital and
/// total cash flow and appends a new entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestLedger {
    preferred_rate: Rate,
    compounding: CompoundingConvention,
    day_count: DayCountConvention,
    rate_decimals: u32,
    entries: Vec<InterestEntry>,
}

impl InterestLedger {
    pub fn new(config: &FundConfig) -> Self {
        Self {
            preferred_rate: config.preferred_rate,
            compounding: config.compounding,
            day_count: config.day_count,
            rate_decimals: config.scale_decimals,
            entries: Vec::new(),
        }
    }

    pub fn compounding(&self) -> CompoundingConvention {
        self.compounding
    }

    pub fn entries(&self) -> &[InterestEntry] {
        &self.entries
    }

    /// Most recent entry, i.e. the ledger's current state.
    pub fn current(&self) -> Option<&InterestEntry> {
        self.entries.last()
    }

    /// State of the ledger as it would stand at `time`, without recording anything.
    pub fn project(&self, time: NaiveDate) -> FundResult<InterestEntry> {
        match self.current() {
            Some(last) => self.catch_up(last, time),
            None => Ok(InterestEntry::empty(time)),
        }
    }

    /// Add deployed capital. Returns the new total cash flow.
    pub fn record_inflow(&mut self, amount: Money, time: NaiveDate) -> FundResult<Money> {
        ensure_positive_amount("amount", amount)?;
        let mut state = self.project(time)?;
        state.capital += amount;
        state.total_cash_flow += amount;
        state.daily_rate = self.daily_rate(state.total_cash_flow)?;

        tracing::info!(
            %amount,
            %time,
            capital = %state.capital,
            total_cash_flow = %state.total_cash_flow,
            "interest ledger inflow"
        );
        let total = state.total_cash_flow;
        self.entries.push(state);
        Ok(total)
    }

    /// Return value to partners, capital first, then accrued preferred return.
    pub fn record_outflow(&mut self, amount: Money, time: NaiveDate) -> FundResult<OutflowSplit> {
        let (state, split) = self.split_outflow(amount, time)?;
        tracing::info!(
            %amount,
            %time,
            capital_paid = %split.capital_paid,
            interest_paid = %split.interest_paid,
            remaining = %split.remaining,
            "interest ledger outflow"
        );
        self.entries.push(state);
        Ok(split)
    }

    /// The split `record_outflow` would produce, without recording it.
    pub fn preview_outflow(&self, amount: Money, time: NaiveDate) -> FundResult<OutflowSplit> {
        self.split_outflow(amount, time).map(|(_, split)| split)
    }

    fn split_outflow(
        &self,
        amount: Money,
        time: NaiveDate,
    ) -> FundResult<(InterestEntry, OutflowSplit)> {
        ensure_positive_amount("amount", amount)?;
        let mut state = self.project(time)?;

        let split = if amount <= state.capital {
            state.capital -= amount;
            state.total_cash_flow -= amount;
            OutflowSplit {
                remaining: Decimal::ZERO,
                capital_paid: amount,
                interest_paid: Decimal::ZERO,
            }
        } else if amount <= state.total_cash_flow {
            let capital_paid = state.capital;
            state.capital = Decimal::ZERO;
            state.total_cash_flow -= amount;
            OutflowSplit {
                remaining: Decimal::ZERO,
                capital_paid,
                interest_paid: amount - capital_paid,
            }
        } else {
            let capital_paid = state.capital;
            let interest_paid = state.total_cash_flow - state.capital;
            let remaining = amount - state.total_cash_flow;
            state.capital = Decimal::ZERO;
            state.total_cash_flow = Decimal::ZERO;
            OutflowSplit {
                remaining,
                capital_paid,
                interest_paid,
            }
        };
        state.daily_rate = self.daily_rate(state.total_cash_flow)?;
        Ok((state, split))
    }

    /// Roll `from` forward to `time`, compounding at every boundary crossed and
    /// accruing the stub after the last boundary.
    fn catch_up(&self, from: &InterestEntry, time: NaiveDate) -> FundResult<InterestEntry> {
        if time < from.timestamp {
            return Err(FundLedgerError::NonMonotonicTimestamp {
                last: from.timestamp,
                requested: time,
            });
        }

        let mut state = from.clone();
        loop {
            let boundary = next_boundary(state.timestamp, self.compounding)?;
            if boundary > time {
                break;
            }
            state = self.accrue_to(state, boundary)?;
            tracing::trace!(
                %boundary,
                total_cash_flow = %state.total_cash_flow,
                "compounded at period boundary"
            );
        }
        self.accrue_to(state, time)
    }

    fn accrue_to(&self, mut state: InterestEntry, to: NaiveDate) -> FundResult<InterestEntry> {
        let days = days_between(state.timestamp, to);
        if days > 0 {
            state.total_cash_flow += self.accrual(state.total_cash_flow, days)?;
            state.daily_rate = self.daily_rate(state.total_cash_flow)?;
        }
        state.timestamp = to;
        Ok(state)
    }

    /// `floor(total_cash_flow * rate * days / day_basis)`, i.e. the daily rate
    /// applied for `days` without intermediate rounding.
    fn accrual(&self, total_cash_flow: Money, days: i64) -> FundResult<Money> {
        let overflow = || FundLedgerError::ScaleOverflow {
            context: "preferred return accrual".into(),
        };
        let accrued = total_cash_flow
            .checked_mul(self.preferred_rate)
            .and_then(|v| v.checked_mul(Decimal::from(days)))
            .ok_or_else(overflow)?
            .checked_div(self.day_count.days_per_year())
            .ok_or_else(overflow)?;
        Ok(accrued.floor())
    }

    fn daily_rate(&self, total_cash_flow: Money) -> FundResult<Money> {
        let rate = total_cash_flow
            .checked_mul(self.preferred_rate)
            .ok_or_else(|| FundLedgerError::ScaleOverflow {
                context: "daily rate".into(),
            })?
            / self.day_count.days_per_year();
        Ok(rate.round_dp_with_strategy(self.rate_decimals, RoundingStrategy::ToZero))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn ledger(compounding: CompoundingConvention) -> InterestLedger {
        InterestLedger::new(&FundConfig {
            compounding,
            ..FundConfig::default()
        })
    }

    #[test]
    fn test_inflow_sets_capital_and_rate() {
        let mut l = ledger(CompoundingConvention::Annual);
        let total = l.record_inflow(dec!(100000), d(2025, 1, 1)).unwrap();
        assert_eq!(total, dec!(100000));

        let entry = l.current().unwrap();
        assert_eq!(entry.capital, dec!(100000));
        // 100,000 * 8% / 365 = 21.91780821...
        assert_eq!(entry.daily_rate, dec!(21.91780821));
    }

    #[test]
    fn test_one_year_annual_accrual_before_capital_return() {
        let mut l = ledger(CompoundingConvention::Annual);
        l.record_inflow(dec!(100000), d(2025, 1, 1)).unwrap();

        let split = l.record_outflow(dec!(50000), d(2026, 1, 1)).unwrap();
        assert_eq!(
            split,
            OutflowSplit {
                remaining: Decimal::ZERO,
                capital_paid: dec!(50000),
                interest_paid: Decimal::ZERO,
            }
        );

        let entry = l.current().unwrap();
        assert_eq!(entry.capital, dec!(50000));
        // A full year at 8% on 100,000 accrued before the capital came out
        assert_eq!(entry.total_cash_flow, dec!(58000));
        assert_eq!(entry.accrued_interest(), dec!(8000));
    }

    #[test]
    fn test_quarterly_compounds_more_than_annual() {
        let mut annual = ledger(CompoundingConvention::Annual);
        let mut quarterly = ledger(CompoundingConvention::Quarterly);
        annual.record_inflow(dec!(100000), d(2025, 1, 1)).unwrap();
        quarterly.record_inflow(dec!(100000), d(2025, 1, 1)).unwrap();

        let a = annual.project(d(2026, 1, 1)).unwrap();
        let q = quarterly.project(d(2026, 1, 1)).unwrap();
        assert_eq!(a.total_cash_flow, dec!(108000));
        // 90, 91, 92, 92 days, each quarter floored and re-based
        assert_eq!(q.total_cash_flow, dec!(108241));
        assert!(q.total_cash_flow > a.total_cash_flow);
    }

    #[test]
    fn test_annual_compounds_across_two_years() {
        let mut l = ledger(CompoundingConvention::Annual);
        l.record_inflow(dec!(100000), d(2025, 1, 1)).unwrap();
        let entry = l.project(d(2027, 1, 1)).unwrap();
        // 108,000 * 1.08 = 116,640
        assert_eq!(entry.total_cash_flow, dec!(116640));
    }

    #[test]
    fn test_outflow_into_interest() {
        let mut l = ledger(CompoundingConvention::Annual);
        l.record_inflow(dec!(100000), d(2025, 1, 1)).unwrap();

        let split = l.record_outflow(dec!(105000), d(2026, 1, 1)).unwrap();
        assert_eq!(split.capital_paid, dec!(100000));
        assert_eq!(split.interest_paid, dec!(5000));
        assert_eq!(split.remaining, Decimal::ZERO);

        let entry = l.current().unwrap();
        assert_eq!(entry.capital, Decimal::ZERO);
        assert_eq!(entry.total_cash_flow, dec!(3000));
    }

    #[test]
    fn test_outflow_beyond_everything_returns_remainder() {
        let mut l = ledger(CompoundingConvention::Annual);
        l.record_inflow(dec!(100000), d(2025, 1, 1)).unwrap();

        let amount = dec!(150000);
        let split = l.record_outflow(amount, d(2026, 1, 1)).unwrap();
        assert_eq!(split.capital_paid, dec!(100000));
        assert_eq!(split.interest_paid, dec!(8000));
        assert_eq!(split.remaining, dec!(42000));
        assert_eq!(
            split.capital_paid + split.interest_paid + split.remaining,
            amount
        );

        let entry = l.current().unwrap();
        assert_eq!(entry.total_cash_flow, Decimal::ZERO);
        assert_eq!(entry.daily_rate, Decimal::ZERO);
    }

    #[test]
    fn test_catch_up_is_idempotent_at_same_time() {
        let mut l = ledger(CompoundingConvention::Quarterly);
        l.record_inflow(dec!(100000), d(2025, 2, 10)).unwrap();

        let once = l.project(d(2025, 9, 3)).unwrap();
        let twice = l.catch_up(&once, d(2025, 9, 3)).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_rejects_past_timestamp() {
        let mut l = ledger(CompoundingConvention::Annual);
        l.record_inflow(dec!(100000), d(2025, 6, 1)).unwrap();
        let err = l.record_inflow(dec!(100), d(2025, 5, 31)).unwrap_err();
        assert!(matches!(err, FundLedgerError::NonMonotonicTimestamp { .. }));
        assert_eq!(l.entries().len(), 1);
    }

    #[test]
    fn test_preview_does_not_mutate() {
        let mut l = ledger(CompoundingConvention::Annual);
        l.record_inflow(dec!(100000), d(2025, 1, 1)).unwrap();
        let preview = l.preview_outflow(dec!(108000), d(2026, 1, 1)).unwrap();
        assert_eq!(preview.interest_paid, dec!(8000));
        assert_eq!(l.entries().len(), 1);
    }

    #[test]
    fn test_total_cash_flow_never_below_capital() {
        let mut l = ledger(CompoundingConvention::Quarterly);
        l.record_inflow(dec!(250000), d(2025, 1, 15)).unwrap();
        l.record_inflow(dec!(100000), d(2025, 5, 20)).unwrap();
        l.record_outflow(dec!(120000), d(2025, 11, 2)).unwrap();
        l.record_inflow(dec!(40000), d(2026, 3, 1)).unwrap();
        l.record_outflow(dec!(400000), d(2027, 7, 1)).unwrap();
        for entry in l.entries() {
            assert!(entry.total_cash_flow >= entry.capital);
        }
    }
}
