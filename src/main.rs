//! # SITCH Sensor
//!
//! Collects GSM band scans and SIM808 engineering-mode data and appends
//! enriched records to the shipped log.

use anyhow::{Context, Result};
use tracing::{error, info};

use sitch_sensor::config::{Config, CONFIG_PATH_ENV};
use sitch_sensor::{pipeline, startup};

/// Main entry point for the sensor runner
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (argument, `SITCH_CONFIG`, or default path)
///    - Start the log shipping agent and helpers; exit with status 2 if the
///      shipper cannot start
///
/// 2. **Main Loop**
///    - Start the four pipeline workers under the supervisor
///    - Restart any worker that dies
///    - Handle Ctrl+C for a clean exit
///
/// # Errors
///
/// Returns error if the configuration cannot be loaded or the record log
/// cannot be opened.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    info!("SITCH sensor v{} starting...", env!("CARGO_PKG_VERSION"));

    let path = Config::resolve_path(
        std::env::args().nth(1),
        std::env::var(CONFIG_PATH_ENV).ok(),
    );
    let config = Config::load(&path)
        .with_context(|| format!("Failed to load configuration from {}", path))?;
    info!("Loaded configuration for device {} from {}", config.device.id, path);

    if let Err(e) = startup::provision(&config.startup).await {
        error!("{}; exiting", e);
        std::process::exit(startup::SHIPPER_FAILURE_EXIT_CODE);
    }

    let supervisor = pipeline::build(&config).context("Failed to assemble pipeline")?;
    info!("Starting workers: {}", supervisor.worker_names().join(", "));

    tokio::select! {
        _ = supervisor.run() => {
            error!("Supervisor stopped unexpectedly");
        }

        // Handle Ctrl+C for graceful shutdown
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    Ok(())
}
