use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::capital_calls::{AccountCapitalCall, CapitalCallBook, IssuedCall};
use crate::commitments::{Commitment, CommitmentLedger, CommitmentState};
use crate::config::FundConfig;
use crate::external::{units_for, UnitClass, UnitInstruction};
use crate::interest::InterestLedger;
use crate::types::*;
use crate::waterfall::{DistributionOutcome, DistributionWaterfall};
use crate::FundResult;

/// Everything the engine owns. Operations mutate it in place and push the
/// unit instructions they imply onto `effects`; the engine decides whether
/// the result is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundState {
    pub config: FundConfig,
    pub commitments: CommitmentLedger,
    pub calls: CapitalCallBook,
    pub interest: InterestLedger,
    pub waterfall: DistributionWaterfall,
    pub paused: bool,
}

impl FundState {
    pub fn new(config: FundConfig) -> FundResult<Self> {
        config.validate()?;
        Ok(Self {
            commitments: CommitmentLedger::new(config.block_size),
            calls: CapitalCallBook::new(),
            interest: InterestLedger::new(&config),
            waterfall: DistributionWaterfall::new(config.carried_interest_rate),
            paused: false,
            config,
        })
    }

    /// Propose or amend an LP commitment. Re-proposing over an approved
    /// commitment burns the commitment units it still holds.
    pub fn propose_commitment(
        &mut self,
        account: &AccountId,
        amount: Money,
        time: NaiveDate,
        effects: &mut Vec<UnitInstruction>,
    ) -> FundResult<Commitment> {
        let reopened = match self.commitments.current(account) {
            Some(c) if c.state == CommitmentState::Approved => Some(c.amount),
            _ => None,
        };
        let commitment = self
            .commitments
            .propose_limited_partner_commitment(account, amount, time)?
            .clone();

        if let Some(previous) = reopened {
            let converted: Units = self
                .calls
                .allocations_for_account(account)
                .filter(|share| share.is_done)
                .map(|share| units_for(share.amount, self.config.unit_price))
                .sum();
            let outstanding = units_for(previous, self.config.unit_price) - converted;
            if outstanding > Decimal::ZERO {
                effects.push(UnitInstruction::Burn {
                    account: account.clone(),
                    class: UnitClass::Commitment,
                    units: outstanding,
                });
            }
        }
        Ok(commitment)
    }

    pub fn cancel_commitment(&mut self, account: &AccountId) -> FundResult<Money> {
        self.commitments.cancel_limited_partner_commitment(account)
    }

    /// Approve a batch and mint commitment units for each approved amount.
    pub fn approve_commitments(
        &mut self,
        accounts: &[AccountId],
        effects: &mut Vec<UnitInstruction>,
    ) -> FundResult<Vec<(AccountId, Money)>> {
        let approved = self.commitments.approve_commitments(accounts)?;
        for (account, amount) in &approved {
            effects.push(UnitInstruction::Mint {
                account: account.clone(),
                class: UnitClass::Commitment,
                units: units_for(*amount, self.config.unit_price),
            });
        }
        Ok(approved)
    }

    pub fn reject_commitments(&mut self, accounts: &[AccountId]) -> FundResult<Vec<AccountId>> {
        self.commitments.reject_commitments(accounts)
    }

    /// Record a GP commitment and re-base its commitment units to the new
    /// amount.
    pub fn record_gp_commitment(
        &mut self,
        account: &AccountId,
        amount: Money,
        time: NaiveDate,
        effects: &mut Vec<UnitInstruction>,
    ) -> FundResult<Commitment> {
        let previous = self
            .commitments
            .current(account)
            .map(|c| c.amount)
            .unwrap_or(Decimal::ZERO);
        let commitment = self
            .commitments
            .record_general_partner_commitment(account, amount, time)?
            .clone();

        let price = self.config.unit_price;
        let delta = units_for(amount, price) - units_for(previous, price);
        if delta > Decimal::ZERO {
            effects.push(UnitInstruction::Mint {
                account: account.clone(),
                class: UnitClass::Commitment,
                units: delta,
            });
        } else if delta < Decimal::ZERO {
            effects.push(UnitInstruction::Burn {
                account: account.clone(),
                class: UnitClass::Commitment,
                units: -delta,
            });
        }
        Ok(commitment)
    }

    pub fn block_commitment(&mut self, account: &AccountId) -> FundResult<Money> {
        self.commitments.block_commitment(account)
    }

    pub fn unblock_commitment(&mut self, account: &AccountId) -> FundResult<Money> {
        self.commitments.unblock_commitment(account)
    }

    /// Issue a call and deploy its amount into the preferred-return ledger.
    pub fn issue_call(
        &mut self,
        amount: Money,
        drawdown_type: &str,
        time: NaiveDate,
    ) -> FundResult<IssuedCall> {
        let issued = self.calls.issue_call(
            amount,
            drawdown_type,
            time,
            &self.commitments,
            self.config.scale(),
        )?;
        self.interest.record_inflow(amount, time)?;
        Ok(issued)
    }

    /// Mark a share funded, converting its commitment units into fund units.
    pub fn fulfill_call(
        &mut self,
        call_id: u64,
        account: &AccountId,
        effects: &mut Vec<UnitInstruction>,
    ) -> FundResult<AccountCapitalCall> {
        let share = self.calls.fulfill_call(call_id, account)?;
        let units = units_for(share.amount, self.config.unit_price);
        effects.push(UnitInstruction::Burn {
            account: account.clone(),
            class: UnitClass::Commitment,
            units,
        });
        effects.push(UnitInstruction::Mint {
            account: account.clone(),
            class: UnitClass::Fund,
            units,
        });
        Ok(share)
    }

    pub fn fail_call(&mut self, call_id: u64, account: &AccountId) -> FundResult<AccountCapitalCall> {
        self.calls.fail_call(call_id, account)
    }

    pub fn distribute(
        &mut self,
        amount: Money,
        distribution_type: &str,
        time: NaiveDate,
    ) -> FundResult<DistributionOutcome> {
        self.waterfall
            .distribute(&mut self.interest, amount, distribution_type, time)
    }

    pub fn set_paused(&mut self, paused: bool, effects: &mut Vec<UnitInstruction>) {
        self.paused = paused;
        effects.push(if paused {
            UnitInstruction::Pause
        } else {
            UnitInstruction::Unpause
        });
    }
}
