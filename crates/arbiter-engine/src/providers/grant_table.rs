//! Concurrent in-memory grant storage.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use arbiter_core::{GrantState, InvalidationTag};
use arbiter_events::InvalidationBus;
use tracing::{debug, warn};

/// What a mutation of a [`GrantTable`] invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectScope {
    /// Subjects are user ids; a change invalidates that user.
    User,
    /// Subjects are client ids; a change invalidates that client.
    Client,
    /// Subjects are not principals (roles, org units); a change invalidates
    /// the permission for everyone.
    Permission,
}

impl SubjectScope {
    fn tag(self, subject: &str, permission: &str) -> InvalidationTag {
        match self {
            Self::User => InvalidationTag::user(subject),
            Self::Client => InvalidationTag::client(subject),
            Self::Permission => InvalidationTag::permission(permission),
        }
    }
}

/// Subject → permission → state, safe to read from many checks at once.
///
/// When a bus is attached, every mutation publishes the matching
/// invalidation before returning, so attached caches have already dropped
/// the affected decisions when the caller proceeds.
#[derive(Debug)]
pub struct GrantTable {
    grants: RwLock<HashMap<String, HashMap<String, GrantState>>>,
    scope: SubjectScope,
    bus: Option<InvalidationBus>,
}

impl GrantTable {
    /// Create an empty table.
    #[must_use]
    pub fn new(scope: SubjectScope) -> Self {
        Self {
            grants: RwLock::new(HashMap::new()),
            scope,
            bus: None,
        }
    }

    /// Publish invalidations for every mutation on `bus`.
    #[must_use]
    pub fn with_bus(mut self, bus: InvalidationBus) -> Self {
        self.bus = Some(bus);
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, HashMap<String, GrantState>>> {
        self.grants.read().unwrap_or_else(|e| {
            warn!("GrantTable lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, HashMap<String, GrantState>>> {
        self.grants.write().unwrap_or_else(|e| {
            warn!("GrantTable lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Record `state` for `subject` on `permission`.
    ///
    /// Setting [`GrantState::Undefined`] removes the entry.
    pub fn set(&self, subject: &str, permission: &str, state: GrantState) {
        if state.is_undefined() {
            self.remove(subject, permission);
            return;
        }

        let previous = self
            .write()
            .entry(subject.to_owned())
            .or_default()
            .insert(permission.to_owned(), state);

        if previous != Some(state) {
            self.publish(subject, permission, "grant changed");
        }
    }

    /// Grant `permission` to `subject`.
    pub fn grant(&self, subject: &str, permission: &str) {
        self.set(subject, permission, GrantState::Granted);
    }

    /// Prohibit `permission` for `subject`.
    pub fn prohibit(&self, subject: &str, permission: &str) {
        self.set(subject, permission, GrantState::Prohibited);
    }

    /// Remove the entry for `subject` on `permission`, returning the old
    /// state.
    pub fn remove(&self, subject: &str, permission: &str) -> Option<GrantState> {
        let previous = {
            let mut grants = self.write();
            let previous = grants
                .get_mut(subject)
                .and_then(|perms| perms.remove(permission));
            if grants.get(subject).is_some_and(HashMap::is_empty) {
                grants.remove(subject);
            }
            previous
        };

        if previous.is_some() {
            self.publish(subject, permission, "grant removed");
        }
        previous
    }

    /// Remove every entry for `subject`. Returns the number removed.
    pub fn remove_subject(&self, subject: &str) -> usize {
        let removed = self.write().remove(subject).unwrap_or_default();
        for permission in removed.keys() {
            self.publish(subject, permission, "subject removed");
        }
        removed.len()
    }

    /// The state recorded for `subject` on `permission`.
    #[must_use]
    pub fn get(&self, subject: &str, permission: &str) -> GrantState {
        self.read()
            .get(subject)
            .and_then(|perms| perms.get(permission))
            .copied()
            .unwrap_or_default()
    }

    /// Number of recorded (subject, permission) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().values().map(HashMap::len).sum()
    }

    /// Whether nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// How mutations are tagged.
    #[must_use]
    pub fn scope(&self) -> SubjectScope {
        self.scope
    }

    fn publish(&self, subject: &str, permission: &str, reason: &str) {
        let tag = self.scope.tag(subject, permission);
        debug!(%tag, subject, permission, reason, "grant table mutated");
        if let Some(bus) = &self.bus {
            bus.invalidate(tag, reason);
        }
    }
}
