//! Grants held by the calling client application.

use std::sync::Arc;

use arbiter_events::InvalidationBus;
use async_trait::async_trait;

use super::grant_table::{GrantTable, SubjectScope};
use crate::error::ProviderResult;
use crate::provider::{GrantOutcome, GrantProvider, GrantRequest};

/// Name of the [`ClientGrantProvider`].
pub const CLIENT_PROVIDER: &str = "Client";

/// Decides from grants recorded against the context's client id.
#[derive(Debug, Clone)]
pub struct ClientGrantProvider {
    table: Arc<GrantTable>,
}

impl ClientGrantProvider {
    /// Create a provider with an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::with_table(Arc::new(GrantTable::new(SubjectScope::Client)))
    }

    /// Create a provider whose table publishes to `bus`.
    #[must_use]
    pub fn with_bus(bus: InvalidationBus) -> Self {
        Self::with_table(Arc::new(GrantTable::new(SubjectScope::Client).with_bus(bus)))
    }

    /// Create a provider over an existing table.
    #[must_use]
    pub fn with_table(table: Arc<GrantTable>) -> Self {
        Self { table }
    }

    /// The backing table.
    #[must_use]
    pub fn table(&self) -> &Arc<GrantTable> {
        &self.table
    }
}

impl Default for ClientGrantProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GrantProvider for ClientGrantProvider {
    fn name(&self) -> &str {
        CLIENT_PROVIDER
    }

    async fn check(&self, request: &GrantRequest) -> ProviderResult<GrantOutcome> {
        let Some(client) = request.context.client_id.as_deref() else {
            return Ok(GrantOutcome::undefined());
        };
        let state = self.table.get(client, request.permission_name());
        Ok(GrantOutcome {
            state,
            provider_key: (!state.is_undefined()).then(|| client.to_owned()),
        })
    }
}
