//! Prelude module - commonly used types for convenient import.
//!
//! Use `use arbiter_telemetry::prelude::*;` to import all essential types.

pub use crate::{LogConfig, LogFormat, LogTarget, TelemetryError, TelemetryResult, setup_logging};
