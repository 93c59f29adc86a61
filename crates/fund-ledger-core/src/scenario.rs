use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::{Caller, CallerRole};
use crate::config::FundConfig;
use crate::error::FundLedgerError;
use crate::external::{AllowList, InMemoryUnitLedger, UnitBalance};
use crate::fund::{FundEngine, FundSummary, PartnerPosition};
use crate::interest::InterestEntry;
use crate::types::*;
use crate::waterfall::DistributionOutcome;
use crate::FundResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// One command against the fund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FundEvent {
    ProposeCommitment {
        account: AccountId,
        amount: Money,
        date: NaiveDate,
    },
    CancelCommitment {
        account: AccountId,
    },
    ApproveCommitments {
        accounts: Vec<AccountId>,
    },
    RejectCommitments {
        accounts: Vec<AccountId>,
    },
    RecordGpCommitment {
        account: AccountId,
        amount: Money,
        date: NaiveDate,
    },
    BlockCommitment {
        account: AccountId,
    },
    UnblockCommitment {
        account: AccountId,
    },
    IssueCapitalCall {
        amount: Money,
        #[serde(default = "default_drawdown_type")]
        drawdown_type: String,
        date: NaiveDate,
    },
    FulfillCapitalCall {
        call_id: u64,
        account: AccountId,
    },
    FailCapitalCall {
        call_id: u64,
        account: AccountId,
    },
    Distribute {
        amount: Money,
        #[serde(default = "default_distribution_type")]
        distribution_type: String,
        date: NaiveDate,
    },
    Pause,
    Unpause,
}

fn default_drawdown_type() -> String {
    "investment".into()
}

fn default_distribution_type() -> String {
    "distribution".into()
}

impl FundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FundEvent::ProposeCommitment { .. } => "propose_commitment",
            FundEvent::CancelCommitment { .. } => "cancel_commitment",
            FundEvent::ApproveCommitments { .. } => "approve_commitments",
            FundEvent::RejectCommitments { .. } => "reject_commitments",
            FundEvent::RecordGpCommitment { .. } => "record_gp_commitment",
            FundEvent::BlockCommitment { .. } => "block_commitment",
            FundEvent::UnblockCommitment { .. } => "unblock_commitment",
            FundEvent::IssueCapitalCall { .. } => "issue_capital_call",
            FundEvent::FulfillCapitalCall { .. } => "fulfill_capital_call",
            FundEvent::FailCapitalCall { .. } => "fail_capital_call",
            FundEvent::Distribute { .. } => "distribute",
            FundEvent::Pause => "pause",
            FundEvent::Unpause => "unpause",
        }
    }
}

/// A command together with the account submitting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioEvent {
    pub caller: AccountId,
    #[serde(flatten)]
    pub event: FundEvent,
}

/// A fund definition plus the ordered commands to run against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: FundConfig,
    /// Verified accounts; every account is eligible when omitted
    #[serde(default)]
    pub eligible: Option<AllowList>,
    pub events: Vec<ScenarioEvent>,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Applied,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventOutcome {
    pub index: usize,
    pub event: String,
    pub caller: AccountId,
    pub status: EventStatus,
    /// Reason code when rejected
    pub code: Option<String>,
    pub message: Option<String>,
    /// Operation return value when applied
    pub result: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub events: Vec<EventOutcome>,
    pub applied: usize,
    pub rejected: usize,
    pub summary: FundSummary,
    pub positions: Vec<PartnerPosition>,
    pub distributions: Vec<DistributionOutcome>,
    pub interest_history: Vec<InterestEntry>,
    pub unit_balances: BTreeMap<AccountId, UnitBalance>,
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

/// Run every event against a fresh fund, in order.
///
/// A rejected event is recorded with its reason code and leaves the fund
/// untouched; replay carries on with the next event.
pub fn replay_scenario(scenario: &Scenario) -> FundResult<ComputationOutput<ScenarioReport>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let units = Arc::new(Mutex::new(InMemoryUnitLedger::new()));
    let eligible = scenario
        .eligible
        .clone()
        .unwrap_or_else(AllowList::allow_all);
    let engine = FundEngine::new(
        scenario.config.clone(),
        Box::new(eligible),
        Box::new(Arc::clone(&units)),
    )?;

    let mut outcomes = Vec::with_capacity(scenario.events.len());
    for (index, entry) in scenario.events.iter().enumerate() {
        let caller = caller_for(&scenario.config, &entry.caller);
        let outcome = match apply_event(&engine, &caller, &entry.event) {
            Ok(result) => EventOutcome {
                index,
                event: entry.event.name().to_string(),
                caller: entry.caller.clone(),
                status: EventStatus::Applied,
                code: None,
                message: None,
                result,
            },
            Err(e) => {
                warnings.push(format!("Event {index} ({}) rejected: {e}", entry.event.name()));
                EventOutcome {
                    index,
                    event: entry.event.name().to_string(),
                    caller: entry.caller.clone(),
                    status: EventStatus::Rejected,
                    code: Some(e.code().to_string()),
                    message: Some(e.to_string()),
                    result: Value::Null,
                }
            }
        };
        outcomes.push(outcome);
    }

    let applied = outcomes
        .iter()
        .filter(|o| o.status == EventStatus::Applied)
        .count();
    let state = engine.snapshot();
    let unit_balances = units
        .lock()
        .map_err(|_| FundLedgerError::UnitLedger("unit ledger lock poisoned".into()))?
        .balances()
        .clone();

    let report = ScenarioReport {
        applied,
        rejected: outcomes.len() - applied,
        events: outcomes,
        summary: state.summary(),
        positions: state.positions(),
        distributions: state.waterfall.outcomes().to_vec(),
        interest_history: state.interest.entries().to_vec(),
        unit_balances,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Fund ledger replay: pro-rata capital calls, compounding preferred return, GP catch-up waterfall",
        &serde_json::json!({
            "block_size": scenario.config.block_size.to_string(),
            "scale_decimals": scenario.config.scale_decimals,
            "preferred_rate": scenario.config.preferred_rate.to_string(),
            "carried_interest_rate": scenario.config.carried_interest_rate.to_string(),
            "compounding": scenario.config.compounding,
            "day_count": scenario.config.day_count,
            "num_events": scenario.events.len(),
        }),
        warnings,
        elapsed,
        report,
    ))
}

/// Administrators named in the config act with administrator capability,
/// everyone else as a partner.
pub fn caller_for(config: &FundConfig, account: &AccountId) -> Caller {
    let role = if config.administrators.contains(account) {
        CallerRole::Administrator
    } else {
        CallerRole::Partner
    };
    Caller {
        account: account.clone(),
        role,
    }
}

/// Dispatch one event to the engine, returning the operation's result as JSON.
pub fn apply_event(engine: &FundEngine, caller: &Caller, event: &FundEvent) -> FundResult<Value> {
    let value = match event {
        FundEvent::ProposeCommitment {
            account,
            amount,
            date,
        } => serde_json::to_value(engine.propose_commitment(caller, account, *amount, *date)?)?,
        FundEvent::CancelCommitment { account } => {
            serde_json::to_value(engine.cancel_commitment(caller, account)?)?
        }
        FundEvent::ApproveCommitments { accounts } => {
            serde_json::to_value(engine.approve_commitments(caller, accounts)?)?
        }
        FundEvent::RejectCommitments { accounts } => {
            serde_json::to_value(engine.reject_commitments(caller, accounts)?)?
        }
        FundEvent::RecordGpCommitment {
            account,
            amount,
            date,
        } => serde_json::to_value(engine.record_gp_commitment(caller, account, *amount, *date)?)?,
        FundEvent::BlockCommitment { account } => {
            serde_json::to_value(engine.block_commitment(caller, account)?)?
        }
        FundEvent::UnblockCommitment { account } => {
            serde_json::to_value(engine.unblock_commitment(caller, account)?)?
        }
        FundEvent::IssueCapitalCall {
            amount,
            drawdown_type,
            date,
        } => serde_json::to_value(engine.issue_capital_call(caller, *amount, drawdown_type, *date)?)?,
        FundEvent::FulfillCapitalCall { call_id, account } => {
            serde_json::to_value(engine.fulfill_capital_call(caller, *call_id, account)?)?
        }
        FundEvent::FailCapitalCall { call_id, account } => {
            serde_json::to_value(engine.fail_capital_call(caller, *call_id, account)?)?
        }
        FundEvent::Distribute {
            amount,
            distribution_type,
            date,
        } => serde_json::to_value(engine.distribute(caller, *amount, distribution_type, *date)?)?,
        FundEvent::Pause => {
            engine.pause(caller)?;
            Value::Null
        }
        FundEvent::Unpause => {
            engine.unpause(caller)?;
            Value::Null
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    const SCENARIO: &str = r#"{
        "config": { "administrators": ["ops"] },
        "events": [
            { "caller": "lp-1", "type": "propose_commitment", "account": "lp-1", "amount": "20000", "date": "2025-01-01" },
            { "caller": "lp-2", "type": "propose_commitment", "account": "lp-2", "amount": "40000", "date": "2025-01-01" },
            { "caller": "lp-2", "type": "approve_commitments", "accounts": ["lp-1", "lp-2"] },
            { "caller": "ops", "type": "approve_commitments", "accounts": ["lp-1", "lp-2"] },
            { "caller": "ops", "type": "issue_capital_call", "amount": "30000", "date": "2025-01-01" },
            { "caller": "ops", "type": "fulfill_capital_call", "call_id": 1, "account": "lp-1" }
        ]
    }"#;

    #[test]
    fn test_replay_reports_rejections_and_continues() {
        let scenario: Scenario = serde_json::from_str(SCENARIO).unwrap();
        let out = replay_scenario(&scenario).unwrap();
        let report = &out.result;

        assert_eq!(report.applied, 5);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.events[2].code.as_deref(), Some("UNAUTHORIZED"));
        assert_eq!(out.warnings.len(), 1);

        assert_eq!(report.summary.total_committed_lp, dec!(60000));
        assert_eq!(report.summary.total_called, dec!(30000));

        let lp1 = &report.unit_balances[&AccountId::from("lp-1")];
        assert_eq!(lp1.commitment, dec!(10000));
        assert_eq!(lp1.fund, dec!(10000));
        let lp2 = &report.unit_balances[&AccountId::from("lp-2")];
        assert_eq!(lp2.commitment, dec!(40000));
    }

    #[test]
    fn test_event_defaults_and_names() {
        let event: ScenarioEvent = serde_json::from_str(
            r#"{ "caller": "ops", "type": "distribute", "amount": "100", "date": "2025-06-01" }"#,
        )
        .unwrap();
        assert_eq!(event.event.name(), "distribute");
        match event.event {
            FundEvent::Distribute {
                distribution_type, ..
            } => assert_eq!(distribution_type, "distribution"),
            other => panic!("Expected Distribute, got: {other:?}"),
        }

        let event: ScenarioEvent =
            serde_json::from_str(r#"{ "caller": "ops", "type": "pause" }"#).unwrap();
        assert_eq!(event.event, FundEvent::Pause);
    }

    #[test]
    fn test_invalid_config_fails_replay() {
        let scenario = Scenario {
            config: FundConfig {
                block_size: dec!(0),
                ..FundConfig::default()
            },
            eligible: None,
            events: Vec::new(),
        };
        assert!(replay_scenario(&scenario).is_err());
    }
}
