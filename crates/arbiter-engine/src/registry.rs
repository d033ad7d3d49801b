//! The ordered set of grant providers.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{RegistryError, RegistryResult};
use crate::provider::GrantProvider;

/// A provider plus how the engine treats its failures.
#[derive(Clone)]
pub struct RegisteredProvider {
    /// The provider.
    pub provider: Arc<dyn GrantProvider>,
    /// Whether a failure or timeout of this provider fails the check.
    pub critical: bool,
}

impl RegisteredProvider {
    /// The provider's name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.provider.name()
    }
}

impl fmt::Debug for RegisteredProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredProvider")
            .field("name", &self.name())
            .field("critical", &self.critical)
            .finish()
    }
}

/// Providers in registration order.
///
/// Built at startup and moved into the
/// [`ResolutionEngine`](crate::ResolutionEngine), after which it can no
/// longer change.
#[derive(Debug, Default, Clone)]
pub struct ProviderRegistry {
    providers: Vec<RegisteredProvider>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a non-critical provider.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateProviderName`] if the name is taken
    /// and [`RegistryError::InvalidProviderName`] if it is blank.
    pub fn register(&mut self, provider: impl GrantProvider + 'static) -> RegistryResult<()> {
        self.insert(Arc::new(provider), false)
    }

    /// Append a provider whose failure or timeout fails the whole check.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub fn register_critical(
        &mut self,
        provider: impl GrantProvider + 'static,
    ) -> RegistryResult<()> {
        self.insert(Arc::new(provider), true)
    }

    /// Append an already shared provider.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub fn register_shared(
        &mut self,
        provider: Arc<dyn GrantProvider>,
        critical: bool,
    ) -> RegistryResult<()> {
        self.insert(provider, critical)
    }

    fn insert(&mut self, provider: Arc<dyn GrantProvider>, critical: bool) -> RegistryResult<()> {
        let name = provider.name();
        if name.trim().is_empty() {
            return Err(RegistryError::InvalidProviderName {
                name: name.to_owned(),
            });
        }
        if self.get(name).is_some() {
            return Err(RegistryError::DuplicateProviderName {
                name: name.to_owned(),
            });
        }

        info!(provider = name, critical, "registered grant provider");
        self.providers
            .push(RegisteredProvider { provider, critical });
        Ok(())
    }

    /// Mark an already registered provider critical.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownProvider`] if no provider has `name`.
    pub fn mark_critical(&mut self, name: &str) -> RegistryResult<()> {
        let entry = self
            .providers
            .iter_mut()
            .find(|p| p.name() == name)
            .ok_or_else(|| RegistryError::UnknownProvider {
                name: name.to_owned(),
            })?;
        entry.critical = true;
        debug!(provider = name, "marked provider critical");
        Ok(())
    }

    /// Providers in registration order.
    #[must_use]
    pub fn all(&self) -> &[RegisteredProvider] {
        &self.providers
    }

    /// Look up a provider by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredProvider> {
        self.providers.iter().find(|p| p.name() == name)
    }

    /// Provider names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(RegisteredProvider::name)
    }

    /// Number of providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderResult;
    use crate::provider::{GrantOutcome, GrantRequest};
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl GrantProvider for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn check(&self, _request: &GrantRequest) -> ProviderResult<GrantOutcome> {
            Ok(GrantOutcome::undefined())
        }
    }

    #[test]
    fn test_registration_order() {
        let mut registry = ProviderRegistry::new();
        registry.register(Named("Role")).unwrap();
        registry.register(Named("User")).unwrap();
        registry.register_critical(Named("Tenant")).unwrap();

        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Role", "User", "Tenant"]);
        assert!(!registry.get("Role").unwrap().critical);
        assert!(registry.get("Tenant").unwrap().critical);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = ProviderRegistry::new();
        registry.register(Named("Role")).unwrap();
        let err = registry.register_critical(Named("Role")).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateProviderName {
                name: "Role".into()
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut registry = ProviderRegistry::new();
        assert!(matches!(
            registry.register(Named("  ")),
            Err(RegistryError::InvalidProviderName { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_mark_critical() {
        let mut registry = ProviderRegistry::new();
        registry.register(Named("Feature")).unwrap();
        registry.mark_critical("Feature").unwrap();
        assert!(registry.get("Feature").unwrap().critical);

        assert_eq!(
            registry.mark_critical("Missing").unwrap_err(),
            RegistryError::UnknownProvider {
                name: "Missing".into()
            }
        );
    }
}
