use clap::Args;
use serde_json::Value;

use fund_ledger_core::config::FundConfig;

use crate::input;

/// Arguments for resolving a fund configuration
#[derive(Args)]
pub struct ConfigArgs {
    /// Configuration file to validate; prints the defaults when omitted
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_config(args: ConfigArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config: FundConfig = match args.input {
        Some(ref path) => input::file::read_structured(path)?,
        None => FundConfig::default(),
    };
    config.validate()?;
    Ok(serde_json::json!({ "result": config }))
}
