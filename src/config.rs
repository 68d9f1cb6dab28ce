//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Loaded once at process start; workers receive clones of the sections
//! they need and never re-read the file.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, SitchError};

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "SITCH_CONFIG";

/// Configuration file used when neither argument nor env var is given
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub device: DeviceConfig,
    pub kalibrate: KalibrateConfig,
    pub sim808: Sim808Config,
    pub record_log: RecordLogConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub startup: StartupConfig,
}

/// Sensor identity
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    pub id: String,

    #[serde(default = "default_platform_name")]
    pub platform_name: String,
}

/// Band scanner configuration
#[derive(Debug, Deserialize, Clone)]
pub struct KalibrateConfig {
    #[serde(default = "default_kal_binary")]
    pub binary: String,

    #[serde(default = "default_kal_band")]
    pub band: String,

    #[serde(default = "default_kal_gain")]
    pub gain: f64,
}

/// Cellular modem configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Sim808Config {
    #[serde(default = "default_sim808_port")]
    pub port: String,

    #[serde(default = "default_sim808_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_sim808_band")]
    pub band: String,
}

/// Record log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RecordLogConfig {
    #[serde(default = "default_log_directory")]
    pub directory: String,

    #[serde(default = "default_log_prefix")]
    pub prefix: String,

    #[serde(default = "default_log_rotation")]
    pub rotation: String,

    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

/// Worker timing
#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_enrichment_backoff_ms")]
    pub enrichment_backoff_ms: u64,

    #[serde(default = "default_writer_backoff_ms")]
    pub writer_backoff_ms: u64,

    #[serde(default = "default_supervisor_interval_s")]
    pub supervisor_interval_s: u64,
}

/// Commands run once before the workers start
#[derive(Debug, Deserialize, Clone)]
pub struct StartupConfig {
    #[serde(default = "default_shipper_start_command")]
    pub shipper_start_command: String,

    #[serde(default = "default_cron_start_command")]
    pub cron_start_command: String,

    #[serde(default = "default_pre_start_commands")]
    pub pre_start_commands: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enrichment_backoff_ms: default_enrichment_backoff_ms(),
            writer_backoff_ms: default_writer_backoff_ms(),
            supervisor_interval_s: default_supervisor_interval_s(),
        }
    }
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            shipper_start_command: default_shipper_start_command(),
            cron_start_command: default_cron_start_command(),
            pre_start_commands: default_pre_start_commands(),
        }
    }
}

impl PipelineConfig {
    pub fn enrichment_backoff(&self) -> Duration {
        Duration::from_millis(self.enrichment_backoff_ms)
    }

    pub fn writer_backoff(&self) -> Duration {
        Duration::from_millis(self.writer_backoff_ms)
    }

    pub fn supervisor_interval(&self) -> Duration {
        Duration::from_secs(self.supervisor_interval_s)
    }
}

/// Accepted values for `record_log.rotation`
pub const ROTATIONS: &[&str] = &["minutely", "hourly", "daily", "never"];

// Default value functions
fn default_platform_name() -> String { "SITCH sensor".to_string() }

fn default_kal_binary() -> String { "/usr/local/bin/kal".to_string() }
fn default_kal_band() -> String { "GSM900".to_string() }
fn default_kal_gain() -> f64 { 60.0 }

fn default_sim808_port() -> String { "/dev/ttyAMA0".to_string() }
fn default_sim808_baud_rate() -> u32 { 9600 }
fn default_sim808_band() -> String { "EGSM_MODE".to_string() }

fn default_log_directory() -> String { "/var/log/sitch".to_string() }
fn default_log_prefix() -> String { "sitch".to_string() }
fn default_log_rotation() -> String { "daily".to_string() }
fn default_max_files() -> usize { 7 }

fn default_enrichment_backoff_ms() -> u64 { 1000 }
fn default_writer_backoff_ms() -> u64 { 3000 }
fn default_supervisor_interval_s() -> u64 { 60 }

fn default_shipper_start_command() -> String { "/etc/init.d/logstash-forwarder start".to_string() }
fn default_cron_start_command() -> String { "/etc/init.d/cron start".to_string() }
fn default_pre_start_commands() -> Vec<String> { vec!["modprobe -r dvb_usb_rtl28xxu".to_string()] }

fn invalid(message: impl std::fmt::Display) -> SitchError {
    SitchError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sitch_sensor::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the configuration path
    ///
    /// First CLI argument, then `SITCH_CONFIG`, then the default path. Empty
    /// values count as unset.
    pub fn resolve_path(arg: Option<String>, env: Option<String>) -> String {
        let given = |path: &String| !path.is_empty();
        arg.filter(given)
            .or_else(|| env.filter(given))
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.device.id.trim().is_empty() {
            return Err(invalid("device id cannot be empty"));
        }

        if self.kalibrate.binary.is_empty() {
            return Err(invalid("kalibrate binary cannot be empty"));
        }

        if self.kalibrate.band.is_empty() {
            return Err(invalid("kalibrate band cannot be empty"));
        }

        if !(0.0..=100.0).contains(&self.kalibrate.gain) {
            return Err(invalid("kalibrate gain must be between 0 and 100"));
        }

        if self.sim808.port.is_empty() {
            return Err(invalid("sim808 port cannot be empty"));
        }

        if self.sim808.band.is_empty() {
            return Err(invalid("sim808 band cannot be empty"));
        }

        if ![1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200].contains(&self.sim808.baud_rate) {
            return Err(invalid("sim808 baud_rate must be a standard rate between 1200 and 115200"));
        }

        if self.record_log.directory.is_empty() {
            return Err(invalid("record_log directory cannot be empty"));
        }

        if self.record_log.prefix.is_empty() {
            return Err(invalid("record_log prefix cannot be empty"));
        }

        if !ROTATIONS.contains(&self.record_log.rotation.as_str()) {
            return Err(invalid(format!(
                "record_log rotation must be one of: {}",
                ROTATIONS.join(", ")
            )));
        }

        if self.pipeline.enrichment_backoff_ms == 0 || self.pipeline.enrichment_backoff_ms > 60000 {
            return Err(invalid("enrichment_backoff_ms must be between 1 and 60000"));
        }

        if self.pipeline.writer_backoff_ms == 0 || self.pipeline.writer_backoff_ms > 60000 {
            return Err(invalid("writer_backoff_ms must be between 1 and 60000"));
        }

        if self.pipeline.supervisor_interval_s == 0 {
            return Err(invalid("supervisor_interval_s must be greater than 0"));
        }

        Ok(())
    }
}
