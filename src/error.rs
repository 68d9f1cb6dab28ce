//! # Error Types
//!
//! Custom error types for the sensor runner using `thiserror`.

use thiserror::Error;

/// Main error type for the sensor runner
#[derive(Debug, Error)]
pub enum SitchError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Band scanner invocation or output errors
    #[error("Scanner error: {0}")]
    Scanner(String),

    /// Modem session errors
    #[error("Modem error: {0}")]
    Modem(String),

    /// Scan document that cannot be classified
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// Unrecoverable startup failures
    #[error("Startup error: {0}")]
    Startup(String),
}

/// Result type alias for the sensor runner
pub type Result<T> = std::result::Result<T, SitchError>;
