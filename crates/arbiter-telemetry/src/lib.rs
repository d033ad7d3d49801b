//! Arbiter Telemetry - Logging for the Arbiter permission engine.
//!
//! Every arbiter crate logs through `tracing`. This crate installs the
//! subscriber: an `EnvFilter` built from a level plus per-crate directives,
//! and one `fmt` layer in the chosen format writing to stdout, stderr, or a
//! rolling file.
//!
//! # Example
//!
//! ```rust,no_run
//! use arbiter_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), arbiter_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("arbiter_engine=debug");
//! setup_logging(&config)?;
//!
//! tracing::info!("logging ready");
//! # Ok(())
//! # }
//! ```
//!
//! With the `config` feature, [`LogConfig::from_section`] builds the config
//! from the `[logging]` section of `arbiter_config::Config`.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
