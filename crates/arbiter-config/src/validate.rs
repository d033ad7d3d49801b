//! Post-merge configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are within
//! acceptable ranges and that cross-field invariants hold.

use std::collections::HashSet;

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Upper bound for `engine.check_deadline_ms` (10 minutes).
pub const MAX_CHECK_DEADLINE_MS: u64 = 600_000;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_engine(config)?;
    validate_cache(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_engine(config: &Config) -> ConfigResult<()> {
    let e = &config.engine;

    if e.check_deadline_ms == 0 || e.check_deadline_ms > MAX_CHECK_DEADLINE_MS {
        return Err(ConfigError::ValidationError {
            field: "engine.check_deadline_ms".to_owned(),
            message: format!("check_deadline_ms must be between 1 and {MAX_CHECK_DEADLINE_MS}"),
        });
    }

    let mut seen = HashSet::new();
    for name in &e.critical_providers {
        if name.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: "engine.critical_providers".to_owned(),
                message: "provider names must not be empty".to_owned(),
            });
        }
        if !seen.insert(name.as_str()) {
            return Err(ConfigError::ValidationError {
                field: "engine.critical_providers".to_owned(),
                message: format!("provider '{name}' is listed more than once"),
            });
        }
    }

    Ok(())
}

fn validate_cache(config: &Config) -> ConfigResult<()> {
    let c = &config.cache;

    if c.enabled && c.capacity == 0 {
        return Err(ConfigError::ValidationError {
            field: "cache.capacity".to_owned(),
            message: "capacity must be at least 1 when the cache is enabled".to_owned(),
        });
    }

    if c.ttl_secs == Some(0) {
        return Err(ConfigError::ValidationError {
            field: "cache.ttl_secs".to_owned(),
            message: "ttl_secs must be positive; omit it to disable expiry".to_owned(),
        });
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        });
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: ConfigResult<()>) -> String {
        match result {
            Err(ConfigError::ValidationError { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_deadline_bounds() {
        let mut config = Config::default();
        config.engine.check_deadline_ms = 0;
        assert_eq!(field_of(validate(&config)), "engine.check_deadline_ms");

        config.engine.check_deadline_ms = MAX_CHECK_DEADLINE_MS;
        assert!(validate(&config).is_ok());

        config.engine.check_deadline_ms = MAX_CHECK_DEADLINE_MS.saturating_add(1);
        assert_eq!(field_of(validate(&config)), "engine.check_deadline_ms");
    }

    #[test]
    fn test_duplicate_critical_provider() {
        let mut config = Config::default();
        config.engine.critical_providers = vec!["Tenant".to_owned(), "Tenant".to_owned()];
        assert_eq!(field_of(validate(&config)), "engine.critical_providers");
    }

    #[test]
    fn test_zero_capacity_only_matters_when_enabled() {
        let mut config = Config::default();
        config.cache.capacity = 0;
        assert_eq!(field_of(validate(&config)), "cache.capacity");

        config.cache.enabled = false;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_unknown_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.format");
    }

    #[test]
    fn test_unknown_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.level");
    }
}
