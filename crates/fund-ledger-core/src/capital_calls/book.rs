use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::allocation::{allocate_pro_rata, Participant, ProRataAllocation};
use crate::commitments::CommitmentLedger;
use crate::error::FundLedgerError;
use crate::types::*;
use crate::FundResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A drawdown request. Immutable once issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalCall {
    pub id: u64,
    pub amount: Money,
    /// Free-form label, e.g. "investment" or "management_fee"
    pub drawdown_type: String,
    pub issued_at: NaiveDate,
}

/// Settlement status of one partner's share of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallStatus {
    Outstanding,
    Funded,
    Defaulted,
}

/// One partner's share of a capital call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountCapitalCall {
    pub call_id: u64,
    pub account: AccountId,
    pub amount: Money,
    pub account_type: PartnerRole,
    pub is_done: bool,
    pub has_failed: bool,
}

impl AccountCapitalCall {
    pub fn status(&self) -> CallStatus {
        if self.is_done {
            CallStatus::Funded
        } else if self.has_failed {
            CallStatus::Defaulted
        } else {
            CallStatus::Outstanding
        }
    }
}

/// A freshly issued call together with its allocation breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedCall {
    pub call: CapitalCall,
    pub allocation: ProRataAllocation,
}

// ---------------------------------------------------------------------------
// Book
// ---------------------------------------------------------------------------

/// Issued capital calls and the per-partner settlement state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapitalCallBook {
    calls: Vec<CapitalCall>,
    /// Keyed by call id, partner shares in participant order
    allocations: BTreeMap<u64, Vec<AccountCapitalCall>>,
    total_called: Money,
}

impl CapitalCallBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_called(&self) -> Money {
        self.total_called
    }

    /// Commitments not yet drawn. Never negative: a blocked commitment can
    /// leave the committed total below what was already called.
    pub fn uncalled(&self, commitments: &CommitmentLedger) -> Money {
        (commitments.total_committed() - self.total_called).max(Decimal::ZERO)
    }

    pub fn calls(&self) -> &[CapitalCall] {
        &self.calls
    }

    pub fn call(&self, call_id: u64) -> Option<&CapitalCall> {
        self.calls.iter().find(|c| c.id == call_id)
    }

    pub fn allocations_for_call(&self, call_id: u64) -> &[AccountCapitalCall] {
        self.allocations
            .get(&call_id)
            .map(|a| a.as_slice())
            .unwrap_or(&[])
    }

    pub fn allocations_for_account<'a>(
        &'a self,
        account: &'a AccountId,
    ) -> impl Iterator<Item = &'a AccountCapitalCall> + 'a {
        self.allocations
            .values()
            .flat_map(|shares| shares.iter())
            .filter(move |s| &s.account == account)
    }

    pub fn allocation(&self, call_id: u64, account: &AccountId) -> Option<&AccountCapitalCall> {
        self.allocations_for_call(call_id)
            .iter()
            .find(|s| &s.account == account)
    }

    /// Draw `amount` from every approved partner pro-rata to its commitment.
    pub fn issue_call(
        &mut self,
        amount: Money,
        drawdown_type: &str,
        issued_at: NaiveDate,
        commitments: &CommitmentLedger,
        scale: Decimal,
    ) -> FundResult<IssuedCall> {
        ensure_positive_amount("amount", amount)?;
        let available = self.uncalled(commitments);
        if amount > available {
            return Err(FundLedgerError::InsufficientCommitments {
                requested: amount,
                available,
            });
        }

        let participants: Vec<Participant> = commitments
            .participants()
            .into_iter()
            .map(|(account, role, committed)| Participant {
                account,
                role,
                committed,
            })
            .collect();
        let allocation =
            allocate_pro_rata(amount, &participants, commitments.total_committed(), scale)?;

        let id = self.calls.len() as u64 + 1;
        let call = CapitalCall {
            id,
            amount,
            drawdown_type: drawdown_type.to_string(),
            issued_at,
        };
        let shares = allocation
            .allocations
            .iter()
            .map(|a| AccountCapitalCall {
                call_id: id,
                account: a.account.clone(),
                amount: a.share,
                account_type: a.role,
                is_done: false,
                has_failed: false,
            })
            .collect();

        self.calls.push(call.clone());
        self.allocations.insert(id, shares);
        self.total_called += amount;

        tracing::info!(
            call_id = id,
            %amount,
            drawdown_type,
            partners = allocation.allocations.len(),
            rounding_loss = %allocation.rounding_loss,
            "capital call issued"
        );
        Ok(IssuedCall { call, allocation })
    }

    /// Mark a partner's share funded. Terminal.
    pub fn fulfill_call(
        &mut self,
        call_id: u64,
        account: &AccountId,
    ) -> FundResult<AccountCapitalCall> {
        let share = self.open_share_mut(call_id, account)?;
        share.is_done = true;
        tracing::info!(call_id, account = %account, amount = %share.amount, "capital call funded");
        Ok(share.clone())
    }

    /// Mark a partner's share defaulted. Terminal.
    pub fn fail_call(&mut self, call_id: u64, account: &AccountId) -> FundResult<AccountCapitalCall> {
        let share = self.open_share_mut(call_id, account)?;
        share.has_failed = true;
        tracing::warn!(call_id, account = %account, amount = %share.amount, "capital call defaulted");
        Ok(share.clone())
    }

    fn open_share_mut(
        &mut self,
        call_id: u64,
        account: &AccountId,
    ) -> FundResult<&mut AccountCapitalCall> {
        let share = self
            .allocations
            .get_mut(&call_id)
            .and_then(|shares| shares.iter_mut().find(|s| &s.account == account))
            .ok_or_else(|| FundLedgerError::UnknownCapitalCall {
                call_id,
                account: account.clone(),
            })?;
        if share.is_done || share.has_failed {
            return Err(FundLedgerError::CapitalCallSettled {
                call_id,
                account: account.clone(),
            });
        }
        Ok(share)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    fn id(s: &str) -> AccountId {
        AccountId::from(s)
    }

    fn two_lp_fund() -> CommitmentLedger {
        let mut ledger = CommitmentLedger::new(dec!(10000));
        ledger
            .propose_limited_partner_commitment(&id("lp-1"), dec!(20000), date())
            .unwrap();
        ledger
            .propose_limited_partner_commitment(&id("lp-2"), dec!(40000), date())
            .unwrap();
        ledger.approve_commitments(&[id("lp-1"), id("lp-2")]).unwrap();
        ledger
    }

    #[test]
    fn test_issue_call_allocates_and_tracks_total() {
        let ledger = two_lp_fund();
        let mut book = CapitalCallBook::new();
        let issued = book
            .issue_call(dec!(30000), "investment", date(), &ledger, dec!(100000000))
            .unwrap();

        assert_eq!(issued.call.id, 1);
        assert_eq!(book.total_called(), dec!(30000));
        assert_eq!(book.uncalled(&ledger), dec!(30000));

        let shares = book.allocations_for_call(1);
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].amount, dec!(10000));
        assert_eq!(shares[1].amount, dec!(20000));
        assert!(shares.iter().all(|s| s.status() == CallStatus::Outstanding));
    }

    #[test]
    fn test_call_beyond_commitments_rejected() {
        let ledger = two_lp_fund();
        let mut book = CapitalCallBook::new();
        book.issue_call(dec!(50000), "investment", date(), &ledger, dec!(100000000))
            .unwrap();

        let err = book
            .issue_call(dec!(10001), "investment", date(), &ledger, dec!(100000000))
            .unwrap_err();
        match err {
            FundLedgerError::InsufficientCommitments {
                requested,
                available,
            } => {
                assert_eq!(requested, dec!(10001));
                assert_eq!(available, dec!(10000));
            }
            other => panic!("Expected InsufficientCommitments, got: {other:?}"),
        }
        assert_eq!(book.calls().len(), 1);
    }

    #[test]
    fn test_fulfill_and_fail_are_terminal() {
        let ledger = two_lp_fund();
        let mut book = CapitalCallBook::new();
        book.issue_call(dec!(30000), "investment", date(), &ledger, dec!(100000000))
            .unwrap();

        let funded = book.fulfill_call(1, &id("lp-1")).unwrap();
        assert!(funded.is_done);
        assert!(matches!(
            book.fail_call(1, &id("lp-1")).unwrap_err(),
            FundLedgerError::CapitalCallSettled { .. }
        ));

        let defaulted = book.fail_call(1, &id("lp-2")).unwrap();
        assert_eq!(defaulted.status(), CallStatus::Defaulted);
        assert!(book.fulfill_call(1, &id("lp-2")).is_err());

        assert!(matches!(
            book.fulfill_call(2, &id("lp-1")).unwrap_err(),
            FundLedgerError::UnknownCapitalCall { .. }
        ));
    }

    #[test]
    fn test_account_view_spans_calls() {
        let ledger = two_lp_fund();
        let mut book = CapitalCallBook::new();
        book.issue_call(dec!(30000), "investment", date(), &ledger, dec!(100000000))
            .unwrap();
        book.issue_call(dec!(6000), "fees", date(), &ledger, dec!(100000000))
            .unwrap();

        let lp2 = id("lp-2");
        let called: Money = book.allocations_for_account(&lp2).map(|s| s.amount).sum();
        assert_eq!(called, dec!(24000));
        assert_eq!(book.call(2).unwrap().drawdown_type, "fees");
    }
}
