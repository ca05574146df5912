//! Field Beacon Daemon
//!
//! Waits for a controller challenge, answers it, and streams telemetry.

use anyhow::Result;
use beacon_daemon::{metrics, sensors, BeaconConfig, ControlInput, Scheduler, SimulatedSensors};
use beacon_transport::bind_udp;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Field Beacon - handheld telemetry beacon
#[derive(Parser, Debug)]
#[command(name = "beacond")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<String>,

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

    info!("Field Beacon v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match &args.config {
        Some(path) => {
            let config = BeaconConfig::load(path).await?;
            info!("Loaded configuration from {}", path);
            config
        }
        None => {
            info!("No configuration file given, using defaults");
            BeaconConfig::default()
        }
    };
    if let Some(listen) = args.listen {
        config.network.listen = listen;
    }

    let socket = bind_udp(config.network.listen).await?;

    let input = ControlInput::new();
    let console_handle = sensors::spawn_console_input(input.clone());
    let sensors = Arc::new(SimulatedSensors::new(&config.sensors, input));

    let scheduler = Scheduler::from_config(&config, socket, sensors)?;

    // Start metrics server
    let metrics_handle = metrics::start_server(
        &config.monitoring,
        scheduler.context().metrics().registry().clone(),
    );

    info!("RADIO SILENCE: awaiting challenge on {}", config.network.listen);

    tokio::select! {
        _ = scheduler.run() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Interrupted, shutting down");
        }
    }

    // Cleanup
    metrics_handle.abort();
    console_handle.abort();

    Ok(())
}
