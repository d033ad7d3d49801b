//! Grants inherited through role membership.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use arbiter_core::{EvaluationContext, GrantState, InvalidationTag};
use arbiter_events::InvalidationBus;
use async_trait::async_trait;
use tracing::{debug, warn};

use super::grant_table::{GrantTable, SubjectScope};
use crate::error::ProviderResult;
use crate::provider::{GrantOutcome, GrantProvider, GrantRequest};

/// Name of the [`RoleGrantProvider`].
pub const ROLE_PROVIDER: &str = "Role";

/// Context extension carrying extra, comma separated role names.
pub const ROLES_EXTENSION: &str = "roles";

/// User → role assignments.
#[derive(Debug, Default)]
pub struct RoleMemberships {
    members: RwLock<HashMap<String, BTreeSet<String>>>,
    bus: Option<InvalidationBus>,
}

impl RoleMemberships {
    /// Create an empty membership table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a user invalidation on every assignment change.
    #[must_use]
    pub fn with_bus(mut self, bus: InvalidationBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Assign `role` to `user`. Returns `false` if it was already assigned.
    pub fn assign(&self, user: &str, role: &str) -> bool {
        let added = self
            .members
            .write()
            .unwrap_or_else(|e| {
                warn!("RoleMemberships lock poisoned, recovering");
                e.into_inner()
            })
            .entry(user.to_owned())
            .or_default()
            .insert(role.to_owned());
        if added {
            self.publish(user, "role assigned");
        }
        added
    }

    /// Remove `role` from `user`. Returns `false` if it was not assigned.
    pub fn unassign(&self, user: &str, role: &str) -> bool {
        let removed = {
            let mut members = self.members.write().unwrap_or_else(|e| {
                warn!("RoleMemberships lock poisoned, recovering");
                e.into_inner()
            });
            let removed = members.get_mut(user).is_some_and(|roles| roles.remove(role));
            if members.get(user).is_some_and(BTreeSet::is_empty) {
                members.remove(user);
            }
            removed
        };
        if removed {
            self.publish(user, "role unassigned");
        }
        removed
    }

    /// Roles assigned to `user`, in name order.
    #[must_use]
    pub fn roles_of(&self, user: &str) -> BTreeSet<String> {
        self.members
            .read()
            .unwrap_or_else(|e| {
                warn!("RoleMemberships lock poisoned, recovering");
                e.into_inner()
            })
            .get(user)
            .cloned()
            .unwrap_or_default()
    }

    fn publish(&self, user: &str, reason: &str) {
        debug!(user, reason, "role membership changed");
        if let Some(bus) = &self.bus {
            bus.invalidate(InvalidationTag::user(user), reason);
        }
    }
}

/// Decides from the grants of every role the context's user holds.
///
/// Roles come from [`RoleMemberships`] plus the [`ROLES_EXTENSION`]
/// context extension. A prohibition on any role wins over a grant on
/// another.
#[derive(Debug, Clone)]
pub struct RoleGrantProvider {
    memberships: Arc<RoleMemberships>,
    grants: Arc<GrantTable>,
}

impl RoleGrantProvider {
    /// Create a provider with empty tables.
    #[must_use]
    pub fn new() -> Self {
        Self::with_tables(
            Arc::new(RoleMemberships::new()),
            Arc::new(GrantTable::new(SubjectScope::Permission)),
        )
    }

    /// Create a provider whose tables publish to `bus`.
    #[must_use]
    pub fn with_bus(bus: InvalidationBus) -> Self {
        Self::with_tables(
            Arc::new(RoleMemberships::new().with_bus(bus.clone())),
            Arc::new(GrantTable::new(SubjectScope::Permission).with_bus(bus)),
        )
    }

    /// Create a provider over existing tables.
    #[must_use]
    pub fn with_tables(memberships: Arc<RoleMemberships>, grants: Arc<GrantTable>) -> Self {
        Self {
            memberships,
            grants,
        }
    }

    /// User → role assignments.
    #[must_use]
    pub fn memberships(&self) -> &Arc<RoleMemberships> {
        &self.memberships
    }

    /// Role → permission grants.
    #[must_use]
    pub fn grants(&self) -> &Arc<GrantTable> {
        &self.grants
    }

    fn roles_for(&self, ctx: &EvaluationContext) -> BTreeSet<String> {
        let mut roles = ctx
            .user_id
            .as_deref()
            .map(|user| self.memberships.roles_of(user))
            .unwrap_or_default();
        if let Some(extra) = ctx.extension(ROLES_EXTENSION) {
            roles.extend(
                extra
                    .split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_owned),
            );
        }
        roles
    }
}

impl Default for RoleGrantProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GrantProvider for RoleGrantProvider {
    fn name(&self) -> &str {
        ROLE_PROVIDER
    }

    async fn check(&self, request: &GrantRequest) -> ProviderResult<GrantOutcome> {
        let permission = request.permission_name();
        let mut granted_by = None;

        for role in self.roles_for(&request.context) {
            match self.grants.get(&role, permission) {
                GrantState::Prohibited => return Ok(GrantOutcome::prohibited(role)),
                GrantState::Granted if granted_by.is_none() => granted_by = Some(role),
                _ => {},
            }
        }

        Ok(granted_by.map_or_else(GrantOutcome::undefined, GrantOutcome::granted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_core::PermissionDefinition;

    fn request(ctx: EvaluationContext) -> GrantRequest {
        GrantRequest::new(Arc::new(PermissionDefinition::new("Orders.Create")), Arc::new(ctx))
    }

    #[tokio::test]
    async fn test_grant_through_membership() {
        let provider = RoleGrantProvider::new();
        provider.memberships().assign("u1", "clerk");
        provider.grants().grant("clerk", "Orders.Create");

        let outcome = provider
            .check(&request(EvaluationContext::new().with_user("u1")))
            .await
            .unwrap();
        assert_eq!(outcome, GrantOutcome::granted("clerk"));
    }

    #[tokio::test]
    async fn test_prohibit_on_any_role_wins() {
        let provider = RoleGrantProvider::new();
        provider.memberships().assign("u1", "admin");
        provider.memberships().assign("u1", "suspended");
        provider.grants().grant("admin", "Orders.Create");
        provider.grants().prohibit("suspended", "Orders.Create");

        let outcome = provider
            .check(&request(EvaluationContext::new().with_user("u1")))
            .await
            .unwrap();
        assert_eq!(outcome, GrantOutcome::prohibited("suspended"));
    }

    #[tokio::test]
    async fn test_roles_from_context_extension() {
        let provider = RoleGrantProvider::new();
        provider.grants().grant("auditor", "Orders.Create");

        let ctx = EvaluationContext::new().with_extension(ROLES_EXTENSION, " viewer , auditor,");
        let outcome = provider.check(&request(ctx)).await.unwrap();
        assert_eq!(outcome, GrantOutcome::granted("auditor"));
    }

    #[tokio::test]
    async fn test_no_roles_is_undefined() {
        let provider = RoleGrantProvider::new();
        let outcome = provider
            .check(&request(EvaluationContext::new().with_user("u1")))
            .await
            .unwrap();
        assert_eq!(outcome, GrantOutcome::undefined());
    }

    #[tokio::test]
    async fn test_membership_changes_publish_user_tag() {
        let bus = InvalidationBus::new();
        let mut receiver = bus.subscribe();
        let provider = RoleGrantProvider::with_bus(bus);

        assert!(provider.memberships().assign("u1", "clerk"));
        assert!(!provider.memberships().assign("u1", "clerk"));
        assert_eq!(receiver.try_recv().unwrap().tag, Some(InvalidationTag::user("u1")));
        assert!(receiver.try_recv().is_none());

        assert!(provider.memberships().unassign("u1", "clerk"));
        assert_eq!(receiver.try_recv().unwrap().reason, "role unassigned");
        assert!(provider.memberships().roles_of("u1").is_empty());
    }
}
