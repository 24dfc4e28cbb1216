//! PolyStatus CLI
//!
//! Command-line entry point for the monitor heartbeat and status engine.

use std::path::PathBuf;

use clap::Parser;
use polystatus::{load_config, Config};
use tracing::Level;

#[derive(Parser)]
#[command(name = "polystatus")]
#[command(about = "Monitor heartbeat and status engine")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API server port (overrides config file)
    #[arg(long)]
    port: Option<u16>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, port={:?}, log_level={:?}",
        args.config,
        args.port,
        args.log_level
    );

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Starting polystatus service");
    tracing::debug!(
        "Monitors: {}, Channels: {}, Tick: {}s",
        config.monitors.len(),
        config.channels.len(),
        config.scheduler.tick_interval_seconds
    );

    polystatus::run(config).await?;

    Ok(())
}
