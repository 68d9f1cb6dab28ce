//! # Band Scanner Module
//!
//! Runs the external Kalibrate scanner over one GSM band.
//!
//! This module handles:
//! - The [`BandScanner`] seam used by the Radio-Scan Producer
//! - Invoking `kal -s <band> -g <gain>` to completion
//! - Parsing its output into channel measurements

pub mod parser;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::document::ChannelMeasurement;
use crate::error::{Result, SitchError};

/// Spectrum sweep over a configured band
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BandScanner: Send + Sync {
    /// Run one scan to completion
    async fn scan_band(&self, band: &str, gain: f64) -> Result<Vec<ChannelMeasurement>>;
}

/// Kalibrate (`kal`) command-line scanner
#[derive(Debug, Clone)]
pub struct KalScanner {
    binary: String,
}

impl KalScanner {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }
}

#[async_trait]
impl BandScanner for KalScanner {
    async fn scan_band(&self, band: &str, gain: f64) -> Result<Vec<ChannelMeasurement>> {
        debug!("Running {} -s {} -g {}", self.binary, band, gain);

        let output = Command::new(&self.binary)
            .arg("-s")
            .arg(band)
            .arg("-g")
            .arg(gain.to_string())
            .output()
            .await
            .map_err(|e| SitchError::Scanner(format!("Failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            return Err(SitchError::Scanner(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let channels = parser::parse_scan_output(&String::from_utf8_lossy(&output.stdout));
        debug!("{} found {} channels in {}", self.binary, channels.len(), band);
        Ok(channels)
    }
}
