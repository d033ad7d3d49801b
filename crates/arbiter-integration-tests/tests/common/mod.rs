//! Shared wiring for integration tests.

use std::sync::Arc;

use arbiter_engine::providers::{
    ClientGrantProvider, ExtensionGrantProvider, RoleGrantProvider, UserGrantProvider,
};
use arbiter_engine::{EngineOptions, ProviderRegistry, ResolutionEngine};
use arbiter_events::InvalidationBus;
use arbiter_test::test_catalog;

/// The four reference providers, all publishing to one bus, registered in
/// front of an engine whose cache listens on that bus.
///
/// The provider fields are clones of the registered providers and share
/// their tables.
#[allow(dead_code)]
pub struct ReferenceStack {
    pub engine: Arc<ResolutionEngine>,
    pub bus: InvalidationBus,
    pub users: UserGrantProvider,
    pub roles: RoleGrantProvider,
    pub clients: ClientGrantProvider,
    pub org_units: ExtensionGrantProvider,
}

#[allow(dead_code)]
impl ReferenceStack {
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        let bus = InvalidationBus::new();
        let users = UserGrantProvider::with_bus(bus.clone());
        let roles = RoleGrantProvider::with_bus(bus.clone());
        let clients = ClientGrantProvider::with_bus(bus.clone());
        let org_units = ExtensionGrantProvider::with_bus("OrgUnit", "org_unit", bus.clone());

        let mut registry = ProviderRegistry::new();
        registry.register(users.clone()).unwrap();
        registry.register(roles.clone()).unwrap();
        registry.register(clients.clone()).unwrap();
        registry.register(org_units.clone()).unwrap();

        let engine = ResolutionEngine::new(Arc::new(test_catalog()), registry, options);
        engine.attach_bus(&bus);

        Self {
            engine: Arc::new(engine),
            bus,
            users,
            roles,
            clients,
            org_units,
        }
    }
}
