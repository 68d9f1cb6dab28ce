//! # Startup
//!
//! One-shot host preparation run before any worker starts.
//!
//! Only the shipping agent is essential: without it nothing leaves the
//! device, so its failure aborts startup. Everything else is logged and
//! skipped.

use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::config::StartupConfig;
use crate::error::{Result, SitchError};

/// Process exit status when the shipping agent cannot be started
pub const SHIPPER_FAILURE_EXIT_CODE: i32 = 2;

/// Run a shell command to completion
///
/// Returns whether it exited successfully. An empty command is skipped and
/// counts as success.
///
/// # Errors
///
/// Returns error if the shell itself cannot be spawned.
pub async fn run_command(command: &str) -> Result<bool> {
    let command = command.trim();
    if command.is_empty() {
        return Ok(true);
    }

    debug!("Running: {}", command);
    let status = Command::new("sh").arg("-c").arg(command).status().await?;
    if !status.success() {
        debug!("{} exited with {}", command, status);
    }
    Ok(status.success())
}

/// Prepare the host for the pipeline
///
/// # Errors
///
/// Returns `Startup` if the shipping agent does not start.
pub async fn provision(config: &StartupConfig) -> Result<()> {
    for command in &config.pre_start_commands {
        match run_command(command).await {
            Ok(true) => {}
            Ok(false) => warn!("Pre-start command failed: {}", command),
            Err(e) => warn!("Could not run pre-start command {}: {}", command, e),
        }
    }

    if !run_command(&config.shipper_start_command).await.unwrap_or(false) {
        error!("Failed to start the log shipping agent");
        return Err(SitchError::Startup(format!(
            "shipping agent did not start: {}",
            config.shipper_start_command
        )));
    }
    info!("Log shipping agent started");

    if !run_command(&config.cron_start_command).await.unwrap_or(false) {
        warn!("Failed to start cron; record logs will not be rotated for the shipper");
    }

    Ok(())
}
