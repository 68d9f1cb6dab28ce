//! # Record Log Module
//!
//! Persistent output shipped to the central collector.
//!
//! Each record is one line, `<RFC 3339 UTC time> <category> <body>`, in
//! files named `<prefix>.<date>.log` rotated by `tracing-appender`.

use std::io::{self, Write};
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use crate::config::RecordLogConfig;
use crate::error::{Result, SitchError};

/// Suffix of every record log file
pub const LOG_SUFFIX: &str = "log";

/// Sink for output records
pub trait RecordLog: Send {
    /// Append one record of the named category
    fn append(&mut self, category: &str, body: &str) -> io::Result<()>;
}

/// Record log rotated on a fixed schedule
pub struct RollingRecordLog {
    appender: RollingFileAppender,
}

impl std::fmt::Debug for RollingRecordLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollingRecordLog").finish_non_exhaustive()
    }
}

fn rotation(name: &str) -> Result<Rotation> {
    match name {
        "minutely" => Ok(Rotation::MINUTELY),
        "hourly" => Ok(Rotation::HOURLY),
        "daily" => Ok(Rotation::DAILY),
        "never" => Ok(Rotation::NEVER),
        other => Err(SitchError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("unknown rotation: {}", other),
        ))),
    }
}

impl RollingRecordLog {
    /// Open the record log in `directory` with the given file prefix
    pub fn open(
        directory: impl AsRef<Path>,
        prefix: &str,
        rotation_name: &str,
        max_files: usize,
    ) -> Result<Self> {
        let mut builder = RollingFileAppender::builder()
            .rotation(rotation(rotation_name)?)
            .filename_prefix(prefix)
            .filename_suffix(LOG_SUFFIX);
        if max_files > 0 {
            builder = builder.max_log_files(max_files);
        }

        let appender = builder
            .build(directory.as_ref())
            .map_err(|e| SitchError::Io(io::Error::new(io::ErrorKind::Other, e)))?;

        Ok(Self { appender })
    }

    pub fn from_config(config: &RecordLogConfig) -> Result<Self> {
        Self::open(
            &config.directory,
            &config.prefix,
            &config.rotation,
            config.max_files,
        )
    }
}

/// Format one record line
pub fn format_record(category: &str, body: &str) -> String {
    format!(
        "{} {} {}\n",
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        category,
        body
    )
}

impl RecordLog for RollingRecordLog {
    fn append(&mut self, category: &str, body: &str) -> io::Result<()> {
        self.appender.write_all(format_record(category, body).as_bytes())?;
        self.appender.flush()
    }
}
