use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use fund_ledger_core::capital_calls::Participant;
use fund_ledger_core::config::FundConfig;
use fund_ledger_core::preview::{self, AllocationPreviewInput, InterestPreviewInput};
use fund_ledger_core::{AccountId, PartnerRole};

use crate::input;

/// Arguments for a stand-alone pro-rata allocation
#[derive(Args)]
pub struct AllocateArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Amount to draw
    #[arg(long)]
    pub amount: Option<Decimal>,

    /// Commitments as account=amount pairs (comma-separated, e.g. "lp-1=20000,lp-2=40000")
    #[arg(long, value_delimiter = ',')]
    pub commitments: Option<Vec<String>>,

    /// Accounts among --commitments that are general partners
    #[arg(long, value_delimiter = ',')]
    pub general_partners: Option<Vec<String>>,

    /// Decimals of the fixed-point denominator
    #[arg(long, default_value_t = 8)]
    pub scale_decimals: u32,
}

pub fn run_allocate(args: AllocateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let allocation_input: AllocationPreviewInput = if let Some(ref path) = args.input {
        input::file::read_structured(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let amount = args
            .amount
            .ok_or("--amount is required (or provide --input)")?;
        let commitments = args
            .commitments
            .ok_or("--commitments is required (or provide --input)")?;
        let gps = args.general_partners.unwrap_or_default();

        let mut participants = Vec::with_capacity(commitments.len());
        for pair in &commitments {
            let (account, committed) = pair
                .split_once('=')
                .ok_or_else(|| format!("Expected account=amount, got '{pair}'"))?;
            let committed: Decimal = committed
                .trim()
                .parse()
                .map_err(|e| format!("Invalid amount in '{pair}': {e}"))?;
            let role = if gps.iter().any(|g| g == account) {
                PartnerRole::GeneralPartner
            } else {
                PartnerRole::LimitedPartner
            };
            participants.push(Participant {
                account: AccountId::from(account.trim()),
                role,
                committed,
            });
        }
        // Calls process GPs first.
        participants.sort_by_key(|p| p.role != PartnerRole::GeneralPartner);

        AllocationPreviewInput {
            amount,
            participants,
            scale_decimals: args.scale_decimals,
        }
    };

    let result = preview::preview_allocation(&allocation_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for replaying cash flows through the preferred-return ledger
#[derive(Args)]
pub struct InterestArgs {
    /// Path to JSON/YAML input file with `flows`
    #[arg(long)]
    pub input: Option<String>,

    /// Fund configuration file replacing the input's own `config`
    #[arg(long)]
    pub config: Option<String>,

    /// Project the ledger to this date (YYYY-MM-DD)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,
}

pub fn run_interest(args: InterestArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut interest_input: InterestPreviewInput =
        input::load(args.input.as_deref(), "interest preview")?;
    if let Some(ref path) = args.config {
        let config: FundConfig = input::file::read_structured(path)?;
        interest_input.config = config;
    }
    if args.as_of.is_some() {
        interest_input.as_of = args.as_of;
    }

    let result = preview::preview_interest(&interest_input)?;
    Ok(serde_json::to_value(result)?)
}
