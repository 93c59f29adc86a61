use std::sync::{Arc, Mutex};

use napi::Result as NapiResult;
use napi_derive::napi;

use fund_ledger_core::config::FundConfig;
use fund_ledger_core::external::{AllowList, InMemoryUnitLedger};
use fund_ledger_core::fund::FundEngine;
use fund_ledger_core::scenario::{self, ScenarioEvent};
use fund_ledger_core::AccountId;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Rejected fund operations keep their reason code in the error status.
fn to_fund_error(e: fund_ledger_core::FundLedgerError) -> napi::Error {
    napi::Error::new(napi::Status::GenericFailure, format!("{}: {}", e.code(), e))
}

// ---------------------------------------------------------------------------
// Stateless calculations
// ---------------------------------------------------------------------------

#[napi]
pub fn replay_scenario(input_json: String) -> NapiResult<String> {
    let input: scenario::Scenario = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = scenario::replay_scenario(&input).map_err(to_fund_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn preview_allocation(input_json: String) -> NapiResult<String> {
    let input: fund_ledger_core::preview::AllocationPreviewInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = fund_ledger_core::preview::preview_allocation(&input).map_err(to_fund_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn preview_interest(input_json: String) -> NapiResult<String> {
    let input: fund_ledger_core::preview::InterestPreviewInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = fund_ledger_core::preview::preview_interest(&input).map_err(to_fund_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn default_config() -> NapiResult<String> {
    serde_json::to_string(&FundConfig::default()).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Live ledger
// ---------------------------------------------------------------------------

/// A fund held in memory across calls from JavaScript.
#[napi]
pub struct FundLedger {
    config: FundConfig,
    engine: FundEngine,
    units: Arc<Mutex<InMemoryUnitLedger>>,
}

#[napi]
impl FundLedger {
    /// `config_json` and `eligible_json` default to the standard fund and an
    /// allow-all compliance list.
    #[napi(constructor)]
    pub fn new(config_json: Option<String>, eligible_json: Option<String>) -> napi::Result<Self> {
        let config: FundConfig = match config_json {
            Some(json) => serde_json::from_str(&json).map_err(to_napi_error)?,
            None => FundConfig::default(),
        };
        let eligible: AllowList = match eligible_json {
            Some(json) => serde_json::from_str(&json).map_err(to_napi_error)?,
            None => AllowList::allow_all(),
        };
        let units = Arc::new(Mutex::new(InMemoryUnitLedger::new()));
        let engine = FundEngine::new(
            config.clone(),
            Box::new(eligible),
            Box::new(Arc::clone(&units)),
        )
        .map_err(to_fund_error)?;
        Ok(Self {
            config,
            engine,
            units,
        })
    }

    /// Apply one `{ "caller": ..., "type": ..., ... }` event; returns the
    /// operation's result.
    #[napi]
    pub fn apply(&self, event_json: String) -> NapiResult<String> {
        let entry: ScenarioEvent = serde_json::from_str(&event_json).map_err(to_napi_error)?;
        let caller = scenario::caller_for(&self.config, &entry.caller);
        let value = scenario::apply_event(&self.engine, &caller, &entry.event)
            .map_err(to_fund_error)?;
        serde_json::to_string(&value).map_err(to_napi_error)
    }

    #[napi]
    pub fn summary(&self) -> NapiResult<String> {
        serde_json::to_string(&self.engine.summary()).map_err(to_napi_error)
    }

    #[napi]
    pub fn position(&self, account: String) -> NapiResult<String> {
        let position = self.engine.position(&AccountId::from(account));
        serde_json::to_string(&position).map_err(to_napi_error)
    }

    #[napi]
    pub fn positions(&self) -> NapiResult<String> {
        let positions = self.engine.read(|state| state.positions());
        serde_json::to_string(&positions).map_err(to_napi_error)
    }

    #[napi]
    pub fn unit_balances(&self) -> NapiResult<String> {
        let units = self.units.lock().map_err(to_napi_error)?;
        serde_json::to_string(units.balances()).map_err(to_napi_error)
    }
}
