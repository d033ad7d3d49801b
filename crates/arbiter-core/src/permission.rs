//! Permission definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named permission as registered in the catalog.
///
/// Definitions are immutable once the catalog has been built. The catalog
/// owns them; the engine hands out shared references to providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDefinition {
    /// Unique permission name (e.g. `"Orders.Create"`).
    pub name: String,
    /// Parent permission name, for hierarchical permissions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Disabled permissions are invisible to regular lookups.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Human readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Names of the providers allowed to decide this permission.
    ///
    /// Empty means every registered provider is consulted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<String>,
    /// Free-form display metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

fn default_enabled() -> bool {
    true
}

impl PermissionDefinition {
    /// Create an enabled, top-level permission.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            enabled: true,
            display_name: None,
            providers: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Set the parent permission.
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set the display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Mark the permission as disabled.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Restrict evaluation to the named provider (may be called repeatedly).
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.providers.push(provider.into());
        self
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Whether the named provider may decide this permission.
    #[must_use]
    pub fn accepts_provider(&self, provider: &str) -> bool {
        self.providers.is_empty() || self.providers.iter().any(|p| p == provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let def = PermissionDefinition::new("Orders.Create")
            .with_parent("Orders")
            .with_display_name("Create orders")
            .with_metadata("group", "sales");

        assert_eq!(def.name, "Orders.Create");
        assert_eq!(def.parent.as_deref(), Some("Orders"));
        assert!(def.enabled);
        assert_eq!(def.metadata.get("group").map(String::as_str), Some("sales"));
    }

    #[test]
    fn test_accepts_provider() {
        let open = PermissionDefinition::new("A");
        assert!(open.accepts_provider("Role"));

        let restricted = PermissionDefinition::new("B").with_provider("User");
        assert!(restricted.accepts_provider("User"));
        assert!(!restricted.accepts_provider("Role"));
    }

    #[test]
    fn test_deserialize_defaults() {
        let def: PermissionDefinition = toml::from_str(r#"name = "Orders""#).unwrap();
        assert!(def.enabled);
        assert!(def.parent.is_none());
        assert!(def.providers.is_empty());
    }
}
