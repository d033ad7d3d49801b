//! Telemetry error types.

use thiserror::Error;

/// Errors raised while configuring logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The logging configuration is invalid.
    #[error("invalid logging configuration: {0}")]
    ConfigError(String),

    /// A global subscriber could not be installed.
    #[error("failed to initialize logging: {0}")]
    InitError(String),

    /// Log output could not be prepared.
    #[error("logging I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
