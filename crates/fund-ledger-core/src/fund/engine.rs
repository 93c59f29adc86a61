use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;

use super::report::{FundSummary, PartnerPosition};
use super::state::FundState;
use crate::auth::Caller;
use crate::capital_calls::{AccountCapitalCall, IssuedCall};
use crate::commitments::Commitment;
use crate::config::FundConfig;
use crate::error::FundLedgerError;
use crate::external::{ComplianceOracle, UnitInstruction, UnitLedger};
use crate::types::*;
use crate::waterfall::DistributionOutcome;
use crate::FundResult;

struct EngineInner {
    state: FundState,
    units: Box<dyn UnitLedger + Send>,
}

/// Single-writer command handler for one fund.
///
/// Every operation checks the caller's capability, runs against a copy of the
/// fund state, hands the resulting unit instructions to the token layer and
/// only then swaps the copy in. A failure at any step leaves both the fund
/// and the token layer untouched.
pub struct FundEngine {
    compliance: Box<dyn ComplianceOracle + Send + Sync>,
    inner: Mutex<EngineInner>,
}

impl FundEngine {
    pub fn new(
        config: FundConfig,
        compliance: Box<dyn ComplianceOracle + Send + Sync>,
        units: Box<dyn UnitLedger + Send>,
    ) -> FundResult<Self> {
        let state = FundState::new(config)?;
        Ok(Self {
            compliance,
            inner: Mutex::new(EngineInner { state, units }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, EngineInner> {
        // State is only ever replaced wholesale, so a poisoned guard still
        // holds a consistent value.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn transact<T>(
        &self,
        operation: &str,
        f: impl FnOnce(&mut FundState, &mut Vec<UnitInstruction>) -> FundResult<T>,
    ) -> FundResult<T> {
        let mut inner = self.lock();
        let mut staged = inner.state.clone();
        let mut effects = Vec::new();

        let result = f(&mut staged, &mut effects).and_then(|value| {
            if !effects.is_empty() {
                inner.units.apply(&effects)?;
            }
            Ok(value)
        });

        match result {
            Ok(value) => {
                inner.state = staged;
                tracing::debug!(operation, effects = effects.len(), "operation committed");
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(operation, code = e.code(), error = %e, "operation rejected");
                Err(e)
            }
        }
    }

    fn ensure_eligible(&self, account: &AccountId) -> FundResult<()> {
        if !self.compliance.is_eligible(account) {
            return Err(FundLedgerError::Ineligible(account.clone()));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Commitments
    // -----------------------------------------------------------------------

    pub fn propose_commitment(
        &self,
        caller: &Caller,
        account: &AccountId,
        amount: Money,
        time: NaiveDate,
    ) -> FundResult<Commitment> {
        self.transact("propose_commitment", |state, effects| {
            caller.require_self(account, "propose_commitment")?;
            self.ensure_eligible(account)?;
            state.propose_commitment(account, amount, time, effects)
        })
    }

    pub fn cancel_commitment(&self, caller: &Caller, account: &AccountId) -> FundResult<Money> {
        self.transact("cancel_commitment", |state, _| {
            caller.require_self(account, "cancel_commitment")?;
            state.cancel_commitment(account)
        })
    }

    pub fn approve_commitments(
        &self,
        caller: &Caller,
        accounts: &[AccountId],
    ) -> FundResult<Vec<(AccountId, Money)>> {
        self.transact("approve_commitments", |state, effects| {
            caller.require_administrator("approve_commitments")?;
            for account in accounts {
                self.ensure_eligible(account)?;
            }
            state.approve_commitments(accounts, effects)
        })
    }

    pub fn reject_commitments(
        &self,
        caller: &Caller,
        accounts: &[AccountId],
    ) -> FundResult<Vec<AccountId>> {
        self.transact("reject_commitments", |state, _| {
            caller.require_administrator("reject_commitments")?;
            state.reject_commitments(accounts)
        })
    }

    pub fn record_gp_commitment(
        &self,
        caller: &Caller,
        account: &AccountId,
        amount: Money,
        time: NaiveDate,
    ) -> FundResult<Commitment> {
        self.transact("record_gp_commitment", |state, effects| {
            caller.require_administrator("record_gp_commitment")?;
            self.ensure_eligible(account)?;
            state.record_gp_commitment(account, amount, time, effects)
        })
    }

    pub fn block_commitment(&self, caller: &Caller, account: &AccountId) -> FundResult<Money> {
        self.transact("block_commitment", |state, _| {
            caller.require_administrator("block_commitment")?;
            state.block_commitment(account)
        })
    }

    pub fn unblock_commitment(&self, caller: &Caller, account: &AccountId) -> FundResult<Money> {
        self.transact("unblock_commitment", |state, _| {
            caller.require_administrator("unblock_commitment")?;
            self.ensure_eligible(account)?;
            state.unblock_commitment(account)
        })
    }

    // -----------------------------------------------------------------------
    // Capital calls
    // -----------------------------------------------------------------------

    pub fn issue_capital_call(
        &self,
        caller: &Caller,
        amount: Money,
        drawdown_type: &str,
        time: NaiveDate,
    ) -> FundResult<IssuedCall> {
        self.transact("issue_capital_call", |state, _| {
            caller.require_administrator("issue_capital_call")?;
            state.issue_call(amount, drawdown_type, time)
        })
    }

    pub fn fulfill_capital_call(
        &self,
        caller: &Caller,
        call_id: u64,
        account: &AccountId,
    ) -> FundResult<AccountCapitalCall> {
        self.transact("fulfill_capital_call", |state, effects| {
            caller.require_administrator("fulfill_capital_call")?;
            state.fulfill_call(call_id, account, effects)
        })
    }

    pub fn fail_capital_call(
        &self,
        caller: &Caller,
        call_id: u64,
        account: &AccountId,
    ) -> FundResult<AccountCapitalCall> {
        self.transact("fail_capital_call", |state, _| {
            caller.require_administrator("fail_capital_call")?;
            state.fail_call(call_id, account)
        })
    }

    // -----------------------------------------------------------------------
    // Distributions and emergency controls
    // -----------------------------------------------------------------------

    pub fn distribute(
        &self,
        caller: &Caller,
        amount: Money,
        distribution_type: &str,
        time: NaiveDate,
    ) -> FundResult<DistributionOutcome> {
        self.transact("distribute", |state, _| {
            caller.require_administrator("distribute")?;
            state.distribute(amount, distribution_type, time)
        })
    }

    pub fn pause(&self, caller: &Caller) -> FundResult<()> {
        self.transact("pause", |state, effects| {
            caller.require_administrator("pause")?;
            state.set_paused(true, effects);
            Ok(())
        })
    }

    pub fn unpause(&self, caller: &Caller) -> FundResult<()> {
        self.transact("unpause", |state, effects| {
            caller.require_administrator("unpause")?;
            state.set_paused(false, effects);
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn summary(&self) -> FundSummary {
        self.lock().state.summary()
    }

    pub fn position(&self, account: &AccountId) -> Option<PartnerPosition> {
        self.lock().state.position(account)
    }

    /// Copy of the full fund state.
    pub fn snapshot(&self) -> FundState {
        self.lock().state.clone()
    }

    /// Run a read-only closure against the current state.
    pub fn read<T>(&self, f: impl FnOnce(&FundState) -> T) -> T {
        f(&self.lock().state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitments::CommitmentState;
    use crate::external::{AllowList, InMemoryUnitLedger};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn engine_with(allow: AllowList) -> FundEngine {
        FundEngine::new(
            FundConfig::default(),
            Box::new(allow),
            Box::new(InMemoryUnitLedger::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_self_only_proposal() {
        let engine = engine_with(AllowList::allow_all());
        let lp = AccountId::from("lp-1");

        let err = engine
            .propose_commitment(&Caller::partner("lp-2"), &lp, dec!(20000), d(2025, 1, 1))
            .unwrap_err();
        assert!(matches!(err, FundLedgerError::Unauthorized { .. }));

        engine
            .propose_commitment(&Caller::partner("lp-1"), &lp, dec!(20000), d(2025, 1, 1))
            .unwrap();
        assert_eq!(engine.snapshot().commitments.state_of(&lp), CommitmentState::Pending);
    }

    #[test]
    fn test_ineligible_account_rejected() {
        let engine = engine_with(AllowList::from_accounts([AccountId::from("lp-1")]));
        let err = engine
            .propose_commitment(
                &Caller::partner("lp-2"),
                &AccountId::from("lp-2"),
                dec!(10000),
                d(2025, 1, 1),
            )
            .unwrap_err();
        assert!(matches!(err, FundLedgerError::Ineligible(_)));
    }

    #[test]
    fn test_ineligible_account_fails_whole_approval() {
        let allow = Arc::new(Mutex::new(AllowList::allow_all()));
        let units = Arc::new(Mutex::new(InMemoryUnitLedger::new()));
        let engine = FundEngine::new(
            FundConfig::default(),
            Box::new(Arc::clone(&allow)),
            Box::new(Arc::clone(&units)),
        )
        .unwrap();
        let accounts: Vec<AccountId> = ["lp-1", "lp-2", "lp-3"]
            .into_iter()
            .map(AccountId::from)
            .collect();
        for account in &accounts {
            engine
                .propose_commitment(
                    &Caller::partner(account.as_str()),
                    account,
                    dec!(20000),
                    d(2025, 1, 1),
                )
                .unwrap();
        }
        *allow.lock().unwrap() =
            AllowList::from_accounts([AccountId::from("lp-1"), AccountId::from("lp-3")]);
        let before = engine.snapshot();

        let err = engine
            .approve_commitments(&Caller::administrator("ops"), &accounts)
            .unwrap_err();
        match err {
            FundLedgerError::Ineligible(account) => assert_eq!(account, AccountId::from("lp-2")),
            other => panic!("Expected Ineligible, got: {other:?}"),
        }
        assert_eq!(engine.snapshot(), before);
        assert_eq!(engine.summary().total_committed_lp, Decimal::ZERO);
        assert!(units.lock().unwrap().balances().is_empty());
    }

    #[test]
    fn test_repropose_after_approval_burns_commitment_units() {
        let units = Arc::new(Mutex::new(InMemoryUnitLedger::new()));
        let engine = FundEngine::new(
            FundConfig::default(),
            Box::new(AllowList::allow_all()),
            Box::new(Arc::clone(&units)),
        )
        .unwrap();
        let admin = Caller::administrator("ops");
        let partner = Caller::partner("lp-1");
        let lp = AccountId::from("lp-1");
        engine
            .propose_commitment(&partner, &lp, dec!(20000), d(2025, 1, 1))
            .unwrap();
        engine.approve_commitments(&admin, &[lp.clone()]).unwrap();
        assert_eq!(units.lock().unwrap().balance(&lp).commitment, dec!(20000));

        let reopened = engine
            .propose_commitment(&partner, &lp, dec!(30000), d(2025, 2, 1))
            .unwrap();
        assert_eq!(reopened.state, CommitmentState::Pending);
        assert_eq!(reopened.amount, dec!(30000));
        assert_eq!(units.lock().unwrap().balance(&lp).commitment, Decimal::ZERO);
        let summary = engine.summary();
        assert_eq!(summary.total_committed_lp, Decimal::ZERO);
        assert_eq!(summary.total_pending_lp, dec!(30000));

        engine.approve_commitments(&admin, &[lp.clone()]).unwrap();
        assert_eq!(units.lock().unwrap().balance(&lp).commitment, dec!(30000));
    }

    #[test]
    fn test_paused_token_layer_rolls_back_approval() {
        let engine = engine_with(AllowList::allow_all());
        let admin = Caller::administrator("ops");
        let lp = AccountId::from("lp-1");
        engine
            .propose_commitment(&Caller::partner("lp-1"), &lp, dec!(20000), d(2025, 1, 1))
            .unwrap();
        engine.pause(&admin).unwrap();

        let err = engine.approve_commitments(&admin, &[lp.clone()]).unwrap_err();
        assert!(matches!(err, FundLedgerError::UnitLedger(_)));
        assert_eq!(engine.snapshot().commitments.state_of(&lp), CommitmentState::Pending);
        assert!(engine.summary().paused);

        engine.unpause(&admin).unwrap();
        engine.approve_commitments(&admin, &[lp.clone()]).unwrap();
        assert_eq!(engine.summary().total_committed_lp, dec!(20000));
    }

    #[test]
    fn test_failed_call_leaves_no_trace() {
        let engine = engine_with(AllowList::allow_all());
        let admin = Caller::administrator("ops");
        let lp = AccountId::from("lp-1");
        engine
            .propose_commitment(&Caller::partner("lp-1"), &lp, dec!(20000), d(2025, 1, 1))
            .unwrap();
        engine.approve_commitments(&admin, &[lp.clone()]).unwrap();
        engine
            .issue_capital_call(&admin, dec!(5000), "investment", d(2025, 6, 1))
            .unwrap();
        let before = engine.snapshot();

        // The call itself is valid, but the ledger cannot move backwards in time
        let err = engine
            .issue_capital_call(&admin, dec!(5000), "investment", d(2025, 5, 1))
            .unwrap_err();
        assert!(matches!(err, FundLedgerError::NonMonotonicTimestamp { .. }));
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn test_partner_cannot_issue_or_distribute() {
        let engine = engine_with(AllowList::allow_all());
        let lp = Caller::partner("lp-1");
        assert!(engine
            .issue_capital_call(&lp, dec!(1), "investment", d(2025, 1, 1))
            .is_err());
        assert!(engine.distribute(&lp, dec!(1), "exit", d(2025, 1, 1)).is_err());
        assert!(engine.pause(&lp).is_err());
    }
}
