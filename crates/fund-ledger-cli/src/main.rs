mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::config::ConfigArgs;
use commands::preview::{AllocateArgs, InterestArgs};
use commands::replay::ReplayArgs;

/// Closed-end fund capital accounting
#[derive(Parser)]
#[command(
    name = "fundctl",
    version,
    about = "Closed-end fund capital accounting",
    long_about = "Replays commitment, capital call and distribution events against a \
                  fund ledger with decimal precision. Supports pro-rata drawdowns, a \
                  compounding preferred return and a GP catch-up waterfall."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log line format on stderr (filter with RUST_LOG)
    #[arg(long, default_value = "text", global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario of fund events and report the resulting ledger
    Replay(ReplayArgs),
    /// Preview a pro-rata capital call allocation
    Allocate(AllocateArgs),
    /// Preview the preferred-return ledger for a series of cash flows
    Interest(InterestArgs),
    /// Validate a fund configuration, or print the defaults
    Config(ConfigArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: &LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_format);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Replay(args) => commands::replay::run_replay(args),
        Commands::Allocate(args) => commands::preview::run_allocate(args),
        Commands::Interest(args) => commands::preview::run_interest(args),
        Commands::Config(args) => commands::config::run_config(args),
        Commands::Version => {
            println!("fundctl {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
