use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::FundLedgerError;
use crate::types::*;
use crate::FundResult;

/// Kind of ownership unit mirrored by the token layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitClass {
    /// Issued on commitment approval, burned as capital is called
    Commitment,
    /// Issued as called capital is funded
    Fund,
}

/// An instruction emitted by the engine for the token layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum UnitInstruction {
    Mint {
        account: AccountId,
        class: UnitClass,
        units: Units,
    },
    Burn {
        account: AccountId,
        class: UnitClass,
        units: Units,
    },
    Pause,
    Unpause,
}

/// Token layer mirroring fund and commitment balances.
///
/// `apply` receives every instruction produced by one engine operation and
/// must apply all of them or none.
pub trait UnitLedger {
    fn apply(&mut self, batch: &[UnitInstruction]) -> FundResult<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitBalance {
    pub commitment: Units,
    pub fund: Units,
}

impl UnitBalance {
    fn slot(&mut self, class: UnitClass) -> &mut Units {
        match class {
            UnitClass::Commitment => &mut self.commitment,
            UnitClass::Fund => &mut self.fund,
        }
    }
}

/// In-process unit ledger used by the CLI, bindings and tests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryUnitLedger {
    paused: bool,
    balances: BTreeMap<AccountId, UnitBalance>,
}

impl InMemoryUnitLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn balance(&self, account: &AccountId) -> UnitBalance {
        self.balances.get(account).cloned().unwrap_or_default()
    }

    pub fn balances(&self) -> &BTreeMap<AccountId, UnitBalance> {
        &self.balances
    }

    fn execute(&mut self, instruction: &UnitInstruction) -> FundResult<()> {
        match instruction {
            UnitInstruction::Mint {
                account,
                class,
                units,
            } => {
                self.ensure_active()?;
                *self.balances.entry(account.clone()).or_default().slot(*class) += *units;
            }
            UnitInstruction::Burn {
                account,
                class,
                units,
            } => {
                self.ensure_active()?;
                let slot = self.balances.entry(account.clone()).or_default().slot(*class);
                if *slot < *units {
                    return Err(FundLedgerError::UnitLedger(format!(
                        "cannot burn {units} {class:?} units from {account}, balance is {slot}"
                    )));
                }
                *slot -= *units;
            }
            UnitInstruction::Pause => self.paused = true,
            UnitInstruction::Unpause => self.paused = false,
        }
        Ok(())
    }

    fn ensure_active(&self) -> FundResult<()> {
        if self.paused {
            return Err(FundLedgerError::UnitLedger("unit ledger is paused".into()));
        }
        Ok(())
    }
}

impl UnitLedger for InMemoryUnitLedger {
    fn apply(&mut self, batch: &[UnitInstruction]) -> FundResult<()> {
        let mut staged = self.clone();
        for instruction in batch {
            staged.execute(instruction)?;
        }
        *self = staged;
        tracing::debug!(instructions = batch.len(), "unit batch applied");
        Ok(())
    }
}

/// Shared handle, so a caller can keep reading balances after handing the
/// ledger to an engine.
impl<L: UnitLedger> UnitLedger for Arc<Mutex<L>> {
    fn apply(&mut self, batch: &[UnitInstruction]) -> FundResult<()> {
        let mut ledger = self
            .lock()
            .map_err(|_| FundLedgerError::UnitLedger("unit ledger lock poisoned".into()))?;
        ledger.apply(batch)
    }
}

/// Whole units a money amount converts to at `unit_price`.
pub fn units_for(amount: Money, unit_price: Money) -> Units {
    if unit_price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (amount / unit_price).floor()
}
