//! The immutable permission catalog.

use arbiter_core::PermissionDefinition;
use std::collections::{BTreeMap, btree_map::Entry};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{CatalogError, CatalogResult};
use crate::source::CatalogSource;

/// Immutable registry mapping permission name to definition.
///
/// Built once, validated, then shared as `Arc<PermissionCatalog>`. All
/// lookups are plain reads of an immutable map, so concurrent access needs
/// no locking.
#[derive(Debug, Default)]
pub struct PermissionCatalog {
    permissions: BTreeMap<String, Arc<PermissionDefinition>>,
}

impl PermissionCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a catalog from a list of definitions.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is empty or duplicated, a parent is
    /// missing, or the parent links form a cycle.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = PermissionDefinition>,
    ) -> CatalogResult<Self> {
        let mut permissions = BTreeMap::new();
        for def in definitions {
            if def.name.trim().is_empty() {
                return Err(CatalogError::InvalidDefinition(
                    "permission name must not be empty".to_owned(),
                ));
            }
            match permissions.entry(def.name.clone()) {
                Entry::Occupied(_) => {
                    return Err(CatalogError::DuplicatePermission { name: def.name });
                },
                Entry::Vacant(slot) => {
                    slot.insert(Arc::new(def));
                },
            }
        }

        let catalog = Self { permissions };
        catalog.validate_parents()?;
        debug!(count = catalog.len(), "permission catalog built");
        Ok(catalog)
    }

    /// Load a catalog from a source.
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails or its definitions are invalid.
    pub fn load(source: &dyn CatalogSource) -> CatalogResult<Self> {
        let definitions = source.load()?;
        let catalog = Self::from_definitions(definitions)?;
        info!(
            source = source.describe(),
            count = catalog.len(),
            "loaded permission catalog"
        );
        Ok(catalog)
    }

    fn validate_parents(&self) -> CatalogResult<()> {
        for def in self.permissions.values() {
            if let Some(parent) = &def.parent
                && !self.permissions.contains_key(parent)
            {
                return Err(CatalogError::MissingParent {
                    name: def.name.clone(),
                    parent: parent.clone(),
                });
            }
        }

        // A chain longer than the catalog must revisit a node.
        let limit = self.permissions.len();
        for def in self.permissions.values() {
            let mut steps: usize = 0;
            let mut current = def.parent.as_deref();
            while let Some(name) = current {
                steps = steps.saturating_add(1);
                if steps > limit {
                    return Err(CatalogError::ParentCycle {
                        name: def.name.clone(),
                    });
                }
                current = self
                    .permissions
                    .get(name)
                    .and_then(|p| p.parent.as_deref());
            }
        }
        Ok(())
    }

    /// Look up an enabled permission.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownPermission`] if the name is not
    /// registered or the permission is disabled.
    pub fn get(&self, name: &str) -> CatalogResult<&Arc<PermissionDefinition>> {
        match self.permissions.get(name) {
            Some(def) if def.enabled => Ok(def),
            _ => Err(CatalogError::UnknownPermission {
                name: name.to_owned(),
            }),
        }
    }

    /// Look up a permission regardless of its enabled flag.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownPermission`] if the name is not registered.
    pub fn get_including_disabled(&self, name: &str) -> CatalogResult<&Arc<PermissionDefinition>> {
        self.permissions
            .get(name)
            .ok_or_else(|| CatalogError::UnknownPermission {
                name: name.to_owned(),
            })
    }

    /// Whether an enabled permission with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }

    /// Iterate over every definition (enabled or not) in name order.
    pub fn iter(&self) -> impl Iterator<Item = &PermissionDefinition> {
        self.permissions.values().map(AsRef::as_ref)
    }

    /// Definitions whose parent is `name`.
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a PermissionDefinition> {
        self.iter()
            .filter(move |d| d.parent.as_deref() == Some(name))
    }

    /// The parent chain of `name`, nearest first.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownPermission`] if `name` is not registered.
    pub fn ancestors(&self, name: &str) -> CatalogResult<Vec<&PermissionDefinition>> {
        let mut chain = Vec::new();
        let mut current = self.get_including_disabled(name)?.parent.as_deref();
        while let Some(parent) = current {
            let def = self.get_including_disabled(parent)?;
            chain.push(def.as_ref());
            current = def.parent.as_deref();
        }
        Ok(chain)
    }

    /// Number of definitions, including disabled ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}
