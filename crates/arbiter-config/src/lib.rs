#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Layered configuration for the Arbiter permission engine.
//!
//! # Usage
//!
//! ```rust,no_run
//! use arbiter_config::Config;
//!
//! // defaults → system → user → explicit file → env fallbacks
//! let resolved = Config::load(None).unwrap();
//! println!("check deadline: {}ms", resolved.config.engine.check_deadline_ms);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Explicit file** passed by the embedding application
//! 2. **User** (`~/.arbiter/config.toml`)
//! 3. **System** (`/etc/arbiter/config.toml`)
//! 4. **Environment variables** (`ARBITER_*`), fallback only
//! 5. **Embedded defaults** (`defaults.toml` compiled into binary)
//!
//! # Design
//!
//! This crate has **no dependencies on other internal arbiter crates**.
//! Conversion into engine and telemetry types happens in those crates.

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered configuration merging with precedence.
pub mod merge;
/// The resolved configuration and its provenance.
pub mod show;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use show::ResolvedConfig;
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// See [`loader::load`] for the algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load(explicit_file: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit_file, None)
    }

    /// Load configuration with an alternate user config directory.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load_with_home(
        explicit_file: Option<&std::path::Path>,
        arbiter_home: &std::path::Path,
    ) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit_file, Some(arbiter_home))
    }

    /// Load configuration from a single file (no layering).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
