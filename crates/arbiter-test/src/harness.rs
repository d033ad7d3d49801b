//! Engine assembly for tests.

use std::sync::Arc;
use std::time::Duration;

use arbiter_catalog::PermissionCatalog;
use arbiter_engine::{EngineOptions, GrantProvider, ProviderRegistry, ResolutionEngine};
use arbiter_events::InvalidationBus;
use tracing_subscriber::EnvFilter;

use crate::fixtures::test_catalog;

/// Install a test-writer subscriber for `filter` (e.g. `"arbiter_engine=debug"`).
///
/// Safe to call from every test; only the first call installs.
pub fn setup_test_logging(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}

/// An engine whose cache listens on [`TestHarness::bus`].
#[derive(Debug)]
pub struct TestHarness {
    /// The engine under test.
    pub engine: Arc<ResolutionEngine>,
    /// Bus the engine's cache is attached to.
    pub bus: InvalidationBus,
}

impl TestHarness {
    /// Start building a harness over [`test_catalog`].
    #[must_use]
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }
}

/// Builder for [`TestHarness`].
#[derive(Debug)]
pub struct TestHarnessBuilder {
    catalog: Option<PermissionCatalog>,
    registry: ProviderRegistry,
    options: EngineOptions,
    bus: InvalidationBus,
}

impl TestHarnessBuilder {
    /// Create a builder with default options and no providers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            catalog: None,
            registry: ProviderRegistry::new(),
            options: EngineOptions::default(),
            bus: InvalidationBus::new(),
        }
    }

    /// The bus the built engine will listen on. Hand it to providers that
    /// publish invalidations.
    #[must_use]
    pub fn bus(&self) -> InvalidationBus {
        self.bus.clone()
    }

    /// Use `catalog` instead of [`test_catalog`].
    #[must_use]
    pub fn with_catalog(mut self, catalog: PermissionCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Register a provider.
    ///
    /// # Panics
    ///
    /// Panics if the name is already registered.
    #[must_use]
    pub fn with_provider(mut self, provider: impl GrantProvider + 'static) -> Self {
        self.registry
            .register(provider)
            .expect("provider names must be unique");
        self
    }

    /// Register a critical provider.
    ///
    /// # Panics
    ///
    /// Panics if the name is already registered.
    #[must_use]
    pub fn with_critical_provider(mut self, provider: impl GrantProvider + 'static) -> Self {
        self.registry
            .register_critical(provider)
            .expect("provider names must be unique");
        self
    }

    /// Set the per-check deadline.
    #[must_use]
    pub fn with_check_deadline(mut self, deadline: Duration) -> Self {
        self.options = self.options.with_check_deadline(deadline);
        self
    }

    /// Build without a cache.
    #[must_use]
    pub fn without_cache(mut self) -> Self {
        self.options = self.options.without_cache();
        self
    }

    /// Assemble the engine and attach its cache to the bus.
    #[must_use]
    pub fn build(self) -> TestHarness {
        let catalog = Arc::new(self.catalog.unwrap_or_else(test_catalog));
        let engine = ResolutionEngine::new(catalog, self.registry, self.options);
        engine.attach_bus(&self.bus);
        TestHarness {
            engine: Arc::new(engine),
            bus: self.bus,
        }
    }
}

impl Default for TestHarnessBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test_context;
    use crate::mocks::MockProvider;
    use arbiter_core::{GrantState, InvalidationTag};

    #[tokio::test]
    async fn test_harness_wires_bus_to_cache() {
        let user = MockProvider::new("User").with_state(GrantState::Granted);
        let harness = TestHarness::builder().with_provider(user.clone()).build();
        let ctx = test_context();

        assert!(harness.engine.is_granted("Orders.Create", &ctx).await.unwrap());
        assert!(harness.engine.is_granted("Orders.Create", &ctx).await.unwrap());
        assert_eq!(user.calls(), 1);

        harness.bus.invalidate(InvalidationTag::user("u1"), "test");
        assert!(harness.engine.is_granted("Orders.Create", &ctx).await.unwrap());
        assert_eq!(user.calls(), 2);
    }
}
