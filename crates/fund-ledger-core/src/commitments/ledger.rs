use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::FundLedgerError;
use crate::types::*;
use crate::FundResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Lifecycle of a single commitment record.
///
/// `None -> Pending -> {Approved | Cancelled | Rejected}`, and `Approved <-> Blocked`
/// when compliance flags the account. `Cancelled` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommitmentState {
    #[default]
    None,
    Pending,
    Approved,
    Cancelled,
    Rejected,
    Blocked,
}

impl CommitmentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CommitmentState::Cancelled | CommitmentState::Rejected)
    }
}

/// A partner's promise to contribute capital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commitment {
    pub owner_role: PartnerRole,
    pub amount: Money,
    pub proposed_at: NaiveDate,
    pub state: CommitmentState,
}

/// Running totals maintained by the ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitmentTotals {
    pub total_committed_gp: Money,
    pub total_committed_lp: Money,
    pub total_pending_lp: Money,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Tracks every partner's commitment history and the fund-level totals.
///
/// Records are never removed: the last record per account is its current
/// commitment, earlier ones are the terminal history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitmentLedger {
    block_size: Money,
    records: BTreeMap<AccountId, Vec<Commitment>>,
    gp_order: Vec<AccountId>,
    lp_order: Vec<AccountId>,
    totals: CommitmentTotals,
}

impl CommitmentLedger {
    pub fn new(block_size: Money) -> Self {
        Self {
            block_size,
            records: BTreeMap::new(),
            gp_order: Vec::new(),
            lp_order: Vec::new(),
            totals: CommitmentTotals::default(),
        }
    }

    pub fn block_size(&self) -> Money {
        self.block_size
    }

    pub fn totals(&self) -> &CommitmentTotals {
        &self.totals
    }

    /// `totalCommittedGp + totalCommittedLp`
    pub fn total_committed(&self) -> Money {
        self.totals.total_committed_gp + self.totals.total_committed_lp
    }

    /// Current commitment of an account, if it ever proposed one.
    pub fn current(&self, account: &AccountId) -> Option<&Commitment> {
        self.records.get(account).and_then(|history| history.last())
    }

    pub fn state_of(&self, account: &AccountId) -> CommitmentState {
        self.current(account)
            .map(|c| c.state)
            .unwrap_or(CommitmentState::None)
    }

    /// Full record history of an account, oldest first.
    pub fn history(&self, account: &AccountId) -> &[Commitment] {
        self.records
            .get(account)
            .map(|h| h.as_slice())
            .unwrap_or(&[])
    }

    /// Approved amount an account participates in calls with (zero otherwise).
    pub fn committed_amount(&self, account: &AccountId) -> Money {
        match self.current(account) {
            Some(c) if c.state == CommitmentState::Approved => c.amount,
            _ => Decimal::ZERO,
        }
    }

    /// Accounts taking part in a capital call: approved GPs first, then
    /// approved LPs, each in the order they first committed.
    pub fn participants(&self) -> Vec<(AccountId, PartnerRole, Money)> {
        self.gp_order
            .iter()
            .chain(self.lp_order.iter())
            .filter_map(|account| {
                let c = self.current(account)?;
                (c.state == CommitmentState::Approved)
                    .then(|| (account.clone(), c.owner_role, c.amount))
            })
            .collect()
    }

    /// Every account the ledger knows, GPs first.
    pub fn accounts(&self) -> impl Iterator<Item = &AccountId> {
        self.gp_order.iter().chain(self.lp_order.iter())
    }

    pub fn propose_limited_partner_commitment(
        &mut self,
        account: &AccountId,
        amount: Money,
        time: NaiveDate,
    ) -> FundResult<&Commitment> {
        ensure_positive_amount("amount", amount)?;
        if !(amount % self.block_size).is_zero() {
            return Err(FundLedgerError::InvalidSize {
                amount,
                block_size: self.block_size,
            });
        }
        self.ensure_role(account, PartnerRole::LimitedPartner)?;

        let state = self.state_of(account);
        match state {
            CommitmentState::Blocked => {
                return Err(FundLedgerError::CommitmentBlocked(account.clone()));
            }
            CommitmentState::Approved => {
                // Back to Pending; the approved amount leaves the committed total.
                let current = self.current_mut(account)?;
                let previous = current.amount;
                current.amount = amount;
                current.proposed_at = time;
                current.state = CommitmentState::Pending;
                self.totals.total_committed_lp -= previous;
                self.totals.total_pending_lp += amount;
            }
            CommitmentState::Pending => {
                // Amend the open proposal in place.
                let current = self.current_mut(account)?;
                let previous = current.amount;
                current.amount = amount;
                current.proposed_at = time;
                self.totals.total_pending_lp = self.totals.total_pending_lp - previous + amount;
            }
            CommitmentState::None | CommitmentState::Cancelled | CommitmentState::Rejected => {
                if state == CommitmentState::None {
                    self.lp_order.push(account.clone());
                }
                self.records
                    .entry(account.clone())
                    .or_default()
                    .push(Commitment {
                        owner_role: PartnerRole::LimitedPartner,
                        amount,
                        proposed_at: time,
                        state: CommitmentState::Pending,
                    });
                self.totals.total_pending_lp += amount;
            }
        }

        tracing::info!(account = %account, %amount, "LP commitment proposed");
        self.current_or_err(account)
    }

    pub fn cancel_limited_partner_commitment(&mut self, account: &AccountId) -> FundResult<Money> {
        let state = self.state_of(account);
        if state != CommitmentState::Pending {
            return Err(FundLedgerError::NotCancellable {
                account: account.clone(),
                state,
            });
        }
        let current = self.current_mut(account)?;
        current.state = CommitmentState::Cancelled;
        let amount = current.amount;
        self.totals.total_pending_lp -= amount;
        tracing::info!(account = %account, %amount, "LP commitment cancelled");
        Ok(amount)
    }

    /// Approve a batch of pending commitments. Either every account is
    /// approved or none is. Returns the approved `(account, amount)` pairs in
    /// batch order.
    pub fn approve_commitments(
        &mut self,
        accounts: &[AccountId],
    ) -> FundResult<Vec<(AccountId, Money)>> {
        self.ensure_batch_pending(accounts, CommitmentState::Approved)?;
        let mut approved = Vec::with_capacity(accounts.len());
        for account in accounts {
            let current = self.current_mut(account)?;
            current.state = CommitmentState::Approved;
            let amount = current.amount;
            self.totals.total_pending_lp -= amount;
            self.totals.total_committed_lp += amount;
            approved.push((account.clone(), amount));
        }
        tracing::info!(count = approved.len(), "LP commitments approved");
        Ok(approved)
    }

    /// Reject a batch of pending commitments, all-or-nothing.
    pub fn reject_commitments(&mut self, accounts: &[AccountId]) -> FundResult<Vec<AccountId>> {
        self.ensure_batch_pending(accounts, CommitmentState::Rejected)?;
        for account in accounts {
            let current = self.current_mut(account)?;
            current.state = CommitmentState::Rejected;
            let amount = current.amount;
            self.totals.total_pending_lp -= amount;
        }
        tracing::info!(count = accounts.len(), "LP commitments rejected");
        Ok(accounts.to_vec())
    }

    /// Create or overwrite an approved GP commitment.
    pub fn record_general_partner_commitment(
        &mut self,
        account: &AccountId,
        amount: Money,
        time: NaiveDate,
    ) -> FundResult<&Commitment> {
        ensure_positive_amount("amount", amount)?;
        self.ensure_role(account, PartnerRole::GeneralPartner)?;

        let previous = self.committed_amount(account);
        let history = self.records.entry(account.clone()).or_default();
        if history.is_empty() {
            self.gp_order.push(account.clone());
        }
        let record = Commitment {
            owner_role: PartnerRole::GeneralPartner,
            amount,
            proposed_at: time,
            state: CommitmentState::Approved,
        };
        match history.last_mut() {
            Some(last) => *last = record,
            None => history.push(record),
        }
        self.totals.total_committed_gp = self.totals.total_committed_gp - previous + amount;

        tracing::info!(account = %account, %amount, "GP commitment recorded");
        self.current_or_err(account)
    }

    /// Compliance hold: `Approved -> Blocked`. The amount leaves the
    /// committed totals until the account is unblocked.
    pub fn block_commitment(&mut self, account: &AccountId) -> FundResult<Money> {
        let amount = self.transition(account, CommitmentState::Approved, CommitmentState::Blocked)?;
        self.adjust_committed(account, -amount);
        tracing::warn!(account = %account, %amount, "commitment blocked");
        Ok(amount)
    }

    /// `Blocked -> Approved`
    pub fn unblock_commitment(&mut self, account: &AccountId) -> FundResult<Money> {
        let amount = self.transition(account, CommitmentState::Blocked, CommitmentState::Approved)?;
        self.adjust_committed(account, amount);
        tracing::info!(account = %account, %amount, "commitment unblocked");
        Ok(amount)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn current_or_err(&self, account: &AccountId) -> FundResult<&Commitment> {
        self.current(account)
            .ok_or_else(|| FundLedgerError::InvalidInput {
                field: "account".into(),
                reason: format!("No commitment recorded for {account}"),
            })
    }

    fn current_mut(&mut self, account: &AccountId) -> FundResult<&mut Commitment> {
        self.records
            .get_mut(account)
            .and_then(|history| history.last_mut())
            .ok_or_else(|| FundLedgerError::InvalidInput {
                field: "account".into(),
                reason: format!("No commitment recorded for {account}"),
            })
    }

    fn ensure_role(&self, account: &AccountId, role: PartnerRole) -> FundResult<()> {
        match self.current(account) {
            Some(c) if c.owner_role != role => Err(FundLedgerError::InvalidInput {
                field: "account".into(),
                reason: format!("{account} already holds a {:?} commitment", c.owner_role),
            }),
            _ => Ok(()),
        }
    }

    /// Every account must be a distinct pending LP. A repeated account is
    /// reported in `target`, the state its first occurrence moves it to.
    fn ensure_batch_pending(
        &self,
        accounts: &[AccountId],
        target: CommitmentState,
    ) -> FundResult<()> {
        if accounts.is_empty() {
            return Err(FundLedgerError::InvalidInput {
                field: "accounts".into(),
                reason: "Batch must name at least one account".into(),
            });
        }
        let mut seen = HashSet::new();
        for account in accounts {
            let state = self.state_of(account);
            let is_lp = self
                .current(account)
                .is_some_and(|c| c.owner_role == PartnerRole::LimitedPartner);
            if !seen.insert(account) {
                return Err(FundLedgerError::NotPending {
                    account: account.clone(),
                    state: target,
                });
            }
            if state != CommitmentState::Pending || !is_lp {
                return Err(FundLedgerError::NotPending {
                    account: account.clone(),
                    state,
                });
            }
        }
        Ok(())
    }

    fn transition(
        &mut self,
        account: &AccountId,
        expected: CommitmentState,
        next: CommitmentState,
    ) -> FundResult<Money> {
        let state = self.state_of(account);
        if state != expected {
            return Err(FundLedgerError::InvalidTransition {
                account: account.clone(),
                state,
                expected,
            });
        }
        let current = self.current_mut(account)?;
        current.state = next;
        Ok(current.amount)
    }

    fn adjust_committed(&mut self, account: &AccountId, delta: Money) {
        match self.current(account).map(|c| c.owner_role) {
            Some(PartnerRole::GeneralPartner) => self.totals.total_committed_gp += delta,
            Some(PartnerRole::LimitedPartner) => self.totals.total_committed_lp += delta,
            None => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
