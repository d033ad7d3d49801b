//! Direct per-user grants.

use std::sync::Arc;

use arbiter_events::InvalidationBus;
use async_trait::async_trait;

use super::grant_table::{GrantTable, SubjectScope};
use crate::error::ProviderResult;
use crate::provider::{GrantOutcome, GrantProvider, GrantRequest};

/// Name of the [`UserGrantProvider`].
pub const USER_PROVIDER: &str = "User";

/// Decides from grants recorded directly against the context's user.
///
/// Anonymous contexts get no opinion.
#[derive(Debug, Clone)]
pub struct UserGrantProvider {
    table: Arc<GrantTable>,
}

impl UserGrantProvider {
    /// Create a provider with an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::with_table(Arc::new(GrantTable::new(SubjectScope::User)))
    }

    /// Create a provider whose table publishes to `bus`.
    #[must_use]
    pub fn with_bus(bus: InvalidationBus) -> Self {
        Self::with_table(Arc::new(GrantTable::new(SubjectScope::User).with_bus(bus)))
    }

    /// Create a provider over an existing table.
    #[must_use]
    pub fn with_table(table: Arc<GrantTable>) -> Self {
        Self { table }
    }

    /// The backing table, for recording grants.
    #[must_use]
    pub fn table(&self) -> &Arc<GrantTable> {
        &self.table
    }
}

impl Default for UserGrantProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GrantProvider for UserGrantProvider {
    fn name(&self) -> &str {
        USER_PROVIDER
    }

    async fn check(&self, request: &GrantRequest) -> ProviderResult<GrantOutcome> {
        let Some(user) = request.context.user_id.as_deref() else {
            return Ok(GrantOutcome::undefined());
        };
        let state = self.table.get(user, request.permission_name());
        Ok(GrantOutcome {
            state,
            provider_key: (!state.is_undefined()).then(|| user.to_owned()),
        })
    }
}
