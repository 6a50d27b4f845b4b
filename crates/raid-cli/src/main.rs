mod cli;
mod relay;
mod simulator;
mod sink;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use raid_rs::metrics;
use raid_rs::retention::array::Array;

use crate::cli::{Cli, Command};
use crate::simulator::Simulator;
use crate::sink::TracingSink;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Simulate(args) => simulate(args).await,
        Command::Relay(args) => {
            let array = Array::new(&args.config()).context("build array")?;
            let answered = tokio::task::spawn_blocking(move || {
                relay::run(&array, io::stdin().lock(), io::stdout().lock())
            })
            .await??;
            info!(answered, "relay: stdin closed");
            Ok(())
        }
    }
}

async fn simulate(args: cli::SimulateArgs) -> Result<()> {
    let array = Arc::new(Array::new(&args.array.config()).context("build array")?);
    let sink = Arc::new(TracingSink::default());
    if !metrics::install(sink.clone()) {
        warn!("metrics sink already installed");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown: ctrl-c");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut report = Simulator::new(array, args).run(shutdown_rx).await?;
    report["metrics"] = sink.summary();
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("encode report")?
    );
    Ok(())
}
