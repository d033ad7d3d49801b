//! The grant provider contract.

use arbiter_core::{EvaluationContext, GrantState, PermissionDefinition};
use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ProviderResult;

/// What a provider is asked to decide.
///
/// Both halves are shared by every provider of one check, so handing the
/// request to a spawned task is a pair of reference-count bumps.
#[derive(Debug, Clone)]
pub struct GrantRequest {
    /// The permission being checked.
    pub permission: Arc<PermissionDefinition>,
    /// The principal it is checked for.
    pub context: Arc<EvaluationContext>,
}

impl GrantRequest {
    /// Create a request.
    #[must_use]
    pub fn new(permission: Arc<PermissionDefinition>, context: Arc<EvaluationContext>) -> Self {
        Self {
            permission,
            context,
        }
    }

    /// Name of the permission being checked.
    #[must_use]
    pub fn permission_name(&self) -> &str {
        &self.permission.name
    }
}

/// A provider's answer, before the engine stamps name and timing on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantOutcome {
    /// The opinion.
    pub state: GrantState,
    /// Which provider-specific key decided (e.g. a role name).
    pub provider_key: Option<String>,
}

impl GrantOutcome {
    /// Grant, attributed to `key`.
    #[must_use]
    pub fn granted(key: impl Into<String>) -> Self {
        Self {
            state: GrantState::Granted,
            provider_key: Some(key.into()),
        }
    }

    /// Prohibit, attributed to `key`.
    #[must_use]
    pub fn prohibited(key: impl Into<String>) -> Self {
        Self {
            state: GrantState::Prohibited,
            provider_key: Some(key.into()),
        }
    }

    /// No opinion.
    #[must_use]
    pub fn undefined() -> Self {
        Self {
            state: GrantState::Undefined,
            provider_key: None,
        }
    }

    /// An outcome with an explicit state and no key.
    #[must_use]
    pub fn from_state(state: GrantState) -> Self {
        Self {
            state,
            provider_key: None,
        }
    }
}

/// An independent source of evidence about whether a permission is granted.
///
/// Providers are registered once at startup and consulted concurrently for
/// every cache miss. A provider must be safe to call from many checks at
/// once and must not assume any ordering relative to other providers.
#[async_trait]
pub trait GrantProvider: Send + Sync {
    /// Unique name, reported in verdicts and matched against
    /// [`PermissionDefinition::providers`].
    fn name(&self) -> &str;

    /// Evaluate one permission for one context.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`](crate::ProviderError) if the evidence
    /// could not be consulted.
    async fn check(&self, request: &GrantRequest) -> ProviderResult<GrantOutcome>;
}

#[async_trait]
impl<P: GrantProvider + ?Sized> GrantProvider for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn check(&self, request: &GrantRequest) -> ProviderResult<GrantOutcome> {
        (**self).check(request).await
    }
}
