use clap::Args;
use serde_json::Value;

use fund_ledger_core::config::FundConfig;
use fund_ledger_core::scenario::{self, Scenario};

use crate::input;

/// Arguments for replaying a fund scenario
#[derive(Args)]
pub struct ReplayArgs {
    /// Path to scenario file (JSON or YAML); read from stdin when omitted
    #[arg(long)]
    pub input: Option<String>,

    /// Fund configuration file replacing the scenario's own `config`
    #[arg(long)]
    pub config: Option<String>,

    /// Exit with an error if any event is rejected
    #[arg(long)]
    pub strict: bool,
}

pub fn run_replay(args: ReplayArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut scenario: Scenario = input::load(args.input.as_deref(), "replay")?;
    if let Some(ref path) = args.config {
        let config: FundConfig = input::file::read_structured(path)?;
        scenario.config = config;
    }

    tracing::info!(events = scenario.events.len(), "replaying scenario");
    let output = scenario::replay_scenario(&scenario)?;

    if args.strict && output.result.rejected > 0 {
        let first = output
            .result
            .events
            .iter()
            .find(|e| e.code.is_some())
            .map(|e| {
                format!(
                    "event {} ({}): {}",
                    e.index,
                    e.event,
                    e.message.as_deref().unwrap_or_default()
                )
            })
            .unwrap_or_default();
        return Err(format!(
            "{} of {} events rejected, first was {first}",
            output.result.rejected,
            output.result.events.len()
        )
        .into());
    }
    Ok(serde_json::to_value(output)?)
}
