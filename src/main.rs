//! # Main: CLI Entry Point
//!
//! Routes subcommands to the scan engine and its maintenance tools.
//!
//! ## Subcommands
//!
//! - `calibrate`: capture the input click point and status region.
//! - `run`: scan the candidate space, resuming from the processed ledger.
//! - `compact`: deduplicate the available and taken ledgers.
//! - `stats`: ledger line and unique counts.
//!
//! ## Global Options
//!
//! - `--config` / `HANDLESCAN_CONFIG`: TOML configuration document.
//! - `--lang`: console language (en, ru).
//! - `LOG_FORMAT=json`: JSON logs; `RUST_LOG` sets the filter.

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use handlescan::locale::Locale;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(
    name = "handlescan",
    about = "Probe short handles against a desktop app and record which are free"
)]
struct Cli {
    /// Path to the TOML configuration (created with defaults if missing)
    #[arg(long, env = "HANDLESCAN_CONFIG", default_value = "handlescan.toml")]
    config: PathBuf,

    /// Console language
    #[arg(long, value_enum, default_value_t = Locale::En)]
    lang: Locale,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactively capture the input field position and status region
    Calibrate,
    /// Probe candidates, skipping everything already processed
    Run {
        /// Minimum handle length
        #[arg(long, default_value_t = 3)]
        min_len: usize,
        /// Maximum handle length
        #[arg(long, default_value_t = 3)]
        max_len: usize,
        /// Allow handles without a digit
        #[arg(long)]
        no_require_digit: bool,
        /// Delete the processed ledger and start over
        #[arg(long)]
        no_resume: bool,
        /// Maximum probes this run (0 = unlimited)
        #[arg(long, default_value_t = 0)]
        max: u64,
    },
    /// Deduplicate the available and taken ledgers
    Compact,
    /// Show ledger counts
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // LOG_FORMAT=json for machine-readable logs, human-readable otherwise
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();

    match &cli.command {
        Commands::Calibrate => cli::run_calibrate(&cli),
        Commands::Run { .. } => cli::run_scan(&cli),
        Commands::Compact => cli::run_compact(&cli),
        Commands::Stats { json } => cli::run_stats(&cli, *json),
    }
}
