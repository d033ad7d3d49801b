//! Configuration types for the Arbiter engine.
//!
//! All types in this module are self-contained with no dependencies on other
//! internal arbiter crates. Conversion into engine and telemetry types
//! happens at the boundary. Every struct implements [`Default`] with the
//! same values as the embedded `defaults.toml`, so a bare `[section]` header
//! produces a working configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration for the Arbiter engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Resolution engine behaviour (deadline, critical providers).
    pub engine: EngineSection,
    /// Decision cache sizing.
    pub cache: CacheSection,
    /// Where permission definitions come from.
    pub catalog: CatalogSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// EngineSection
// ---------------------------------------------------------------------------

/// Resolution engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Absolute deadline for one check, shared by all providers.
    pub check_deadline_ms: u64,
    /// Names of providers whose failure or timeout fails the check.
    pub critical_providers: Vec<String>,
}

impl EngineSection {
    /// The check deadline as a [`Duration`].
    #[must_use]
    pub fn check_deadline(&self) -> Duration {
        Duration::from_millis(self.check_deadline_ms)
    }
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            check_deadline_ms: 2000,
            critical_providers: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// CacheSection
// ---------------------------------------------------------------------------

/// Decision cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Whether decisions are cached at all.
    pub enabled: bool,
    /// Maximum number of cached decisions.
    pub capacity: usize,
    /// Optional maximum entry age in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,
}

impl CacheSection {
    /// The entry TTL, if configured.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 4096,
            ttl_secs: None,
        }
    }
}

// ---------------------------------------------------------------------------
// CatalogSection
// ---------------------------------------------------------------------------

/// Permission catalog location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSection {
    /// TOML file with `[[permission]]` tables. `None` means the embedding
    /// application supplies definitions in code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"` (human-friendly), `"compact"` (one-line),
    /// `"json"` (structured), or `"full"` (verbose).
    pub format: String,
    /// Per-crate tracing directives (e.g. `["arbiter_engine=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "pretty".to_owned(),
            directives: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_sections_use_defaults() {
        let config: Config = toml::from_str("[engine]\n[cache]\n").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_section() {
        let config: Config = toml::from_str(
            r#"
            [engine]
            critical_providers = ["Tenant"]

            [cache]
            ttl_secs = 30
        "#,
        )
        .unwrap();
        assert_eq!(config.engine.check_deadline_ms, 2000);
        assert_eq!(config.engine.critical_providers, vec!["Tenant"]);
        assert_eq!(config.cache.ttl(), Some(Duration::from_secs(30)));
        assert!(config.cache.enabled);
    }
}
