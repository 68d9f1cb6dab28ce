//! # Modem Module
//!
//! Handles the engineering-mode session with the SIM808 cellular modem.
//!
//! This module handles:
//! - Opening the serial port the modem is attached to
//! - Band selection and GNSS power-up
//! - Turning the modem's unsolicited output into telemetry lines

pub mod parser;
pub mod port_trait;
pub mod sim808;

use async_trait::async_trait;

use crate::document::TelemetryLine;
use crate::error::Result;

pub use sim808::{Sim808Connector, Sim808Session};

/// An open modem session
///
/// After setup, behaves as a lazy, non-restartable sequence of lines.
#[async_trait]
pub trait ModemSession: Send {
    /// Select the operating band
    async fn set_band(&mut self, band: &str) -> Result<()>;

    /// Power up GNSS and request periodic fix reports
    async fn trigger_gps(&mut self) -> Result<()>;

    /// Next parsed telemetry line, `None` once the stream has ended
    async fn next_line(&mut self) -> Result<Option<TelemetryLine>>;
}

/// Opens modem sessions on a serial endpoint
#[async_trait]
pub trait ModemConnector: Send + Sync {
    async fn open(&self, port: &str) -> Result<Box<dyn ModemSession>>;
}
