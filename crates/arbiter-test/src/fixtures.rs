//! Test fixtures for common types.

use arbiter_catalog::PermissionCatalog;
use arbiter_core::{EvaluationContext, PermissionDefinition};

/// Names defined by [`test_catalog`].
pub const TEST_PERMISSIONS: &[&str] = &[
    "Orders",
    "Orders.Create",
    "Orders.Delete",
    "Orders.Archive",
    "Reports.Export",
];

/// Create a top-level permission definition.
#[must_use]
pub fn test_permission(name: impl Into<String>) -> PermissionDefinition {
    PermissionDefinition::new(name)
}

/// A small catalog:
///
/// - `Orders`, with children `Orders.Create` and `Orders.Delete`
/// - `Orders.Archive`, disabled
/// - `Reports.Export`, decided only by the `Role` provider
///
/// # Panics
///
/// Never; the definitions are statically valid.
#[must_use]
pub fn test_catalog() -> PermissionCatalog {
    PermissionCatalog::from_definitions(vec![
        PermissionDefinition::new("Orders"),
        PermissionDefinition::new("Orders.Create").with_parent("Orders"),
        PermissionDefinition::new("Orders.Delete").with_parent("Orders"),
        PermissionDefinition::new("Orders.Archive")
            .with_parent("Orders")
            .disabled(),
        PermissionDefinition::new("Reports.Export").with_provider("Role"),
    ])
    .expect("test catalog is valid")
}

/// A context for user `u1` in tenant `acme`.
#[must_use]
pub fn test_context() -> EvaluationContext {
    EvaluationContext::new().with_user("u1").with_tenant("acme")
}

/// A context for `user` in tenant `acme`.
#[must_use]
pub fn test_context_for(user: impl Into<String>) -> EvaluationContext {
    EvaluationContext::new().with_user(user).with_tenant("acme")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_fixture() {
        let catalog = test_catalog();
        assert_eq!(catalog.len(), TEST_PERMISSIONS.len());
        assert!(catalog.get("Orders.Create").is_ok());
        assert!(catalog.get("Orders.Archive").is_err());
        assert_eq!(catalog.children("Orders").count(), 3);
    }

    #[test]
    fn test_context_fixtures() {
        assert_ne!(test_context().fingerprint(), test_context_for("u2").fingerprint());
        assert_eq!(test_context().fingerprint(), test_context_for("u1").fingerprint());
    }
}
