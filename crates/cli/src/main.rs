//! Attest command line interface
//!
//! Submits registrations, endorsements and sweeps to a local ledger and
//! prints results as JSON.

mod commands;
mod settings;

use anyhow::{Context, Result};
use attest_ledger::{Ledger, LedgerStore, MemoryLedgerStore, SledLedgerStore, Timestamp};
use clap::Parser;
use commands::{Commands, Invocation};
use settings::{AttestConfig, Backend, LogFormat};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "attest")]
#[command(about = "Content-attestation ledger", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Ledger data directory
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Current time in UNIX seconds instead of the system clock
    #[arg(long, global = true, value_name = "SECS")]
    now: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AttestConfig::load(cli.config.as_deref())?
        .with_overrides(cli.data_dir, cli.log_level);
    init_logging(&config)?;

    let invocation = Invocation {
        now: cli.now.map(Timestamp).unwrap_or_else(Timestamp::now),
        sweep_batch: config.sweep_batch,
        page_limit: config.page_limit,
    };

    let output = match config.backend {
        Backend::Sled => {
            std::fs::create_dir_all(&config.data_dir).with_context(|| {
                format!("failed to create data dir {}", config.data_dir.display())
            })?;
            let store = SledLedgerStore::open(&config.data_dir).with_context(|| {
                format!("failed to open ledger at {}", config.data_dir.display())
            })?;
            info!(path = %config.data_dir.display(), "opened sled ledger");
            let ledger = Ledger::new(store);
            let output = run(&ledger, cli.command, &invocation)?;
            ledger.store().flush().context("failed to flush ledger")?;
            output
        }
        Backend::Memory => {
            info!("using in-memory ledger; state is discarded on exit");
            run(&Ledger::new(MemoryLedgerStore::new()), cli.command, &invocation)?
        }
    };

    println!("{output}");
    Ok(())
}

fn run<S: LedgerStore>(
    ledger: &Ledger<S>,
    command: Commands,
    invocation: &Invocation,
) -> Result<String> {
    let value = commands::execute(ledger, command, invocation)?;
    Ok(serde_json::to_string_pretty(&value)?)
}

fn init_logging(config: &AttestConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let installed = match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.pretty())
            .try_init(),
    };
    installed.context("failed to install tracing subscriber")?;

    Ok(())
}
