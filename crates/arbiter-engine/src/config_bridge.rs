//! Bridge from `arbiter_config::Config` to engine types.
//!
//! The config crate has no dependencies on other internal crates; this
//! module translates its sections into engine options, a cache config and a
//! loaded catalog.

use std::sync::Arc;

use arbiter_cache::CacheConfig;
use arbiter_catalog::{CatalogResult, PermissionCatalog, TomlCatalogSource};
use arbiter_config::{CacheSection, CatalogSection, Config};

use crate::engine::{EngineOptions, ResolutionEngine};
use crate::error::ResolutionResult;
use crate::registry::ProviderRegistry;

/// Convert the `[cache]` section. `None` when caching is disabled.
#[must_use]
pub fn to_cache_config(section: &CacheSection) -> Option<CacheConfig> {
    if !section.enabled {
        return None;
    }
    let config = CacheConfig::with_capacity(section.capacity);
    Some(match section.ttl() {
        Some(ttl) => config.with_ttl(ttl),
        None => config,
    })
}

/// Convert config to [`EngineOptions`].
#[must_use]
pub fn to_engine_options(cfg: &Config) -> EngineOptions {
    EngineOptions {
        check_deadline: cfg.engine.check_deadline(),
        cache: to_cache_config(&cfg.cache),
    }
}

/// Load the catalog named by `[catalog] path`, or an empty catalog when no
/// path is configured.
///
/// # Errors
///
/// Returns a catalog error if the file cannot be read, parsed, or
/// validated.
pub fn load_catalog(section: &CatalogSection) -> CatalogResult<PermissionCatalog> {
    match &section.path {
        Some(path) => PermissionCatalog::load(&TomlCatalogSource::new(path)),
        None => Ok(PermissionCatalog::empty()),
    }
}

impl ResolutionEngine {
    /// Assemble an engine from loaded configuration.
    ///
    /// Providers named in `engine.critical_providers` are marked critical.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownProvider`](crate::RegistryError) if a
    /// critical provider is not registered.
    pub fn from_config(
        catalog: Arc<PermissionCatalog>,
        mut registry: ProviderRegistry,
        cfg: &Config,
    ) -> ResolutionResult<Self> {
        for name in &cfg.engine.critical_providers {
            registry.mark_critical(name)?;
        }
        Ok(Self::new(catalog, registry, to_engine_options(cfg)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RegistryError, ResolutionError};
    use std::time::Duration;

    #[test]
    fn test_cache_section_conversion() {
        let mut section = CacheSection::default();
        section.capacity = 8;
        section.ttl_secs = Some(3);
        let cache = to_cache_config(&section).unwrap();
        assert_eq!(cache.capacity.get(), 8);
        assert_eq!(cache.ttl, Some(Duration::from_secs(3)));

        section.enabled = false;
        assert!(to_cache_config(&section).is_none());
    }

    #[test]
    fn test_engine_options_from_config() {
        let mut cfg = Config::default();
        cfg.engine.check_deadline_ms = 150;
        let options = to_engine_options(&cfg);
        assert_eq!(options.check_deadline, Duration::from_millis(150));
        assert!(options.cache.is_some());
    }

    #[test]
    fn test_unknown_critical_provider() {
        let mut cfg = Config::default();
        cfg.engine.critical_providers = vec!["Tenant".to_owned()];
        let err = ResolutionEngine::from_config(
            Arc::new(PermissionCatalog::empty()),
            ProviderRegistry::new(),
            &cfg,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ResolutionError::Registry(RegistryError::UnknownProvider {
                name: "Tenant".into()
            })
        );
    }

    #[test]
    fn test_load_catalog_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("permissions.toml");
        std::fs::write(
            &path,
            "[[permission]]\nname = \"Orders\"\n\n\
             [[permission]]\nname = \"Orders.Create\"\nparent = \"Orders\"\n",
        )
        .unwrap();

        let section = CatalogSection { path: Some(path) };
        let catalog = load_catalog(&section).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(load_catalog(&CatalogSection::default()).unwrap().is_empty());
    }
}
