//! Field Beacon Controller
//!
//! Challenges a beacon and logs the telemetry it streams back.

use anyhow::Result;
use beacon_controller::{ControllerConfig, ControllerLink, MissionLog};
use clap::Parser;
use std::net::SocketAddr;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Field Beacon Controller - challenge a beacon and receive telemetry
#[derive(Parser, Debug)]
#[command(name = "beacon-ctl")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<String>,

    /// Beacon address, overrides the configuration file
    #[arg(short, long)]
    beacon: Option<SocketAddr>,

    /// Override the listen address
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run in verbose mode
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Field Beacon Controller v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match &args.config {
        Some(path) => {
            let config = ControllerConfig::load(path).await?;
            info!("Loaded configuration from {}", path);
            config
        }
        None => ControllerConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.network.listen = listen;
    }

    let Some(beacon) = args.beacon.or(config.network.beacon) else {
        anyhow::bail!("No beacon address: pass --beacon or set network.beacon");
    };

    let mut link = ControllerLink::bind(&config, beacon).await?;
    if config.mission_log.enabled {
        let log = MissionLog::open(&config.mission_log.path)?;
        info!("Recording mission events to {}", log.path().display());
        link = link.with_mission_log(log);
    }

    tokio::select! {
        result = link.run() => result?,
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Interrupted, shutting down");
        }
    }

    Ok(())
}
