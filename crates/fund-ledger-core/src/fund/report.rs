use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::state::FundState;
use crate::capital_calls::CallStatus;
use crate::commitments::CommitmentState;
use crate::config::CompoundingConvention;
use crate::interest::InterestEntry;
use crate::types::*;

/// Fund-level aggregates at a point in the event history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundSummary {
    pub total_committed_gp: Money,
    pub total_committed_lp: Money,
    pub total_committed: Money,
    pub total_pending_lp: Money,
    pub total_called: Money,
    pub uncalled_commitments: Money,
    pub gp_catchup: Money,
    pub lp_return: Money,
    pub gp_return: Money,
    pub carried_interest_rate: Rate,
    pub preferred_rate: Rate,
    pub compounding: CompoundingConvention,
    pub capital_calls: usize,
    pub distributions: usize,
    /// Latest preferred-return ledger entry, if any capital was deployed
    pub interest: Option<InterestEntry>,
    pub paused: bool,
}

/// One partner's standing across commitments and calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerPosition {
    pub account: AccountId,
    pub role: PartnerRole,
    pub state: CommitmentState,
    pub committed: Money,
    pub called: Money,
    pub funded: Money,
    pub defaulted: Money,
    pub outstanding: Money,
    /// Approved commitment not yet called
    pub uncalled: Money,
}

impl FundState {
    pub fn summary(&self) -> FundSummary {
        let commitments = self.commitments.totals();
        let waterfall = self.waterfall.totals();
        FundSummary {
            total_committed_gp: commitments.total_committed_gp,
            total_committed_lp: commitments.total_committed_lp,
            total_committed: self.commitments.total_committed(),
            total_pending_lp: commitments.total_pending_lp,
            total_called: self.calls.total_called(),
            uncalled_commitments: self.calls.uncalled(&self.commitments),
            gp_catchup: waterfall.gp_catchup,
            lp_return: waterfall.lp_return,
            gp_return: waterfall.gp_return,
            carried_interest_rate: self.config.carried_interest_rate,
            preferred_rate: self.config.preferred_rate,
            compounding: self.config.compounding,
            capital_calls: self.calls.calls().len(),
            distributions: self.waterfall.distributions().len(),
            interest: self.interest.current().cloned(),
            paused: self.paused,
        }
    }

    pub fn position(&self, account: &AccountId) -> Option<PartnerPosition> {
        let commitment = self.commitments.current(account)?;
        let mut position = PartnerPosition {
            account: account.clone(),
            role: commitment.owner_role,
            state: commitment.state,
            committed: self.commitments.committed_amount(account),
            called: Decimal::ZERO,
            funded: Decimal::ZERO,
            defaulted: Decimal::ZERO,
            outstanding: Decimal::ZERO,
            uncalled: Decimal::ZERO,
        };
        for share in self.calls.allocations_for_account(account) {
            position.called += share.amount;
            match share.status() {
                CallStatus::Funded => position.funded += share.amount,
                CallStatus::Defaulted => position.defaulted += share.amount,
                CallStatus::Outstanding => position.outstanding += share.amount,
            }
        }
        position.uncalled = (position.committed - position.called).max(Decimal::ZERO);
        Some(position)
    }

    /// Positions of every known partner, GPs first.
    pub fn positions(&self) -> Vec<PartnerPosition> {
        self.commitments
            .accounts()
            .filter_map(|account| self.position(account))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FundConfig;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_position_tracks_call_status() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut state = FundState::new(FundConfig::default()).unwrap();
        let lp1 = AccountId::from("lp-1");
        let lp2 = AccountId::from("lp-2");
        state
            .propose_commitment(&lp1, dec!(20000), date, &mut Vec::new())
            .unwrap();
        state
            .propose_commitment(&lp2, dec!(40000), date, &mut Vec::new())
            .unwrap();
        state
            .approve_commitments(&[lp1.clone(), lp2.clone()], &mut Vec::new())
            .unwrap();
        state.issue_call(dec!(30000), "investment", date).unwrap();
        state.fulfill_call(1, &lp1, &mut Vec::new()).unwrap();
        state.fail_call(1, &lp2).unwrap();

        let p1 = state.position(&lp1).unwrap();
        assert_eq!(p1.called, dec!(10000));
        assert_eq!(p1.funded, dec!(10000));
        assert_eq!(p1.uncalled, dec!(10000));

        let p2 = state.position(&lp2).unwrap();
        assert_eq!(p2.defaulted, dec!(20000));
        assert_eq!(p2.outstanding, Decimal::ZERO);

        let summary = state.summary();
        assert_eq!(summary.total_called, dec!(30000));
        assert_eq!(summary.uncalled_commitments, dec!(30000));
        assert_eq!(state.positions().len(), 2);
        assert!(state.position(&AccountId::from("nobody")).is_none());
    }
}
