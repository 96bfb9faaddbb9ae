//! Event stats CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: load `event-stats.toml` (or `--config`) and
//!    apply command-line overrides.
//! 2. **Wire observability**: configure `tracing-subscriber` with a fmt layer
//!    and, when `OTEL_EXPORTER_OTLP_ENDPOINT` is set, an OpenTelemetry OTLP
//!    exporter. All spans and events emitted by every crate flow through it.
//! 3. **Construct infrastructure**: create the `HttpEventSource` and inject
//!    it into the event stats DAG.
//! 4. **Dispatch**: run the DAG, a single task, or print the DAG.
//!
//! The process exits non-zero when any task fails, so the caller's own
//! retry policy can take over.

mod cli;
mod commands;
mod config;
mod observability;

use anyhow::Result;
use clap::Parser;
use tasks::{CALCULATE_STATS, FETCH_EVENTS};
use tracing::info;

use cli::{Cli, Commands};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _telemetry = observability::init(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "event-stats starting");

    let result = dispatch(cli).await;
    if let Err(ref e) = result {
        tracing::error!(error = %format!("{e:#}"), "Command failed");
    }
    result
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?.with_overrides(cli.base_url, cli.data_dir);

    match &cli.command {
        Commands::Run(args) => commands::run(&config, args).await,
        Commands::Fetch(args) => commands::run_single(&config, args, FETCH_EVENTS).await,
        Commands::Stats(args) => commands::run_single(&config, args, CALCULATE_STATS).await,
        Commands::Show(args) => commands::show(&config, args),
    }
}
