//! REFLEX - multi-reactor real-time executive.
//!
//! Loads a TOML agent configuration, builds the configured reactors
//! from the builtin factory, and runs the tick loop until the final
//! tick passes or ctrl-c requests shutdown.
//!
//! # Environment
//!
//! - `REFLEX_LOG`: tracing filter (default `info`, or `debug` with `-d`)
//! - `REFLEX_LOG_DIR`: observation transcript directory
//! - `REFLEX_FINAL_TICK`: final tick override

use anyhow::{Context, Result};
use clap::Parser;
use reflex_runtime::{builtin_factory, Agent, AgentConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Multi-reactor real-time executive.
#[derive(Parser, Debug)]
#[command(name = "reflex")]
#[command(version, about, long_about = None)]
struct Args {
    /// Agent configuration file
    #[arg(short, long, default_value = "reflex.toml")]
    config: PathBuf,

    /// Override the configured final tick
    #[arg(long)]
    final_tick: Option<u64>,

    /// Override the observation log directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let mut config = AgentConfig::load(&args.config)
        .with_context(|| format!("loading config '{}'", args.config.display()))?;
    if let Some(final_tick) = args.final_tick {
        config.final_tick = Some(final_tick);
    }
    if let Some(log_dir) = args.log_dir {
        config.log_dir = Some(log_dir);
    }

    let factory = builtin_factory();
    let mut agent = Agent::new(&config, &factory).context("building agent")?;

    let shutdown = agent.shutdown_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, requesting shutdown");
            shutdown.request();
        }
    });

    agent.run().await.context("agent run failed")?;

    info!(
        ticks = agent.monitor().history().len(),
        last_tick = agent.monitor().last().map(|s| s.tick),
        "run complete"
    );
    Ok(())
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_env("REFLEX_LOG").unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout)
        .init();
}
