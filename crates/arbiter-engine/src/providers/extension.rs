//! Grants keyed by a context extension value.

use std::sync::Arc;

use arbiter_events::InvalidationBus;
use async_trait::async_trait;

use super::grant_table::{GrantTable, SubjectScope};
use crate::error::ProviderResult;
use crate::provider::{GrantOutcome, GrantProvider, GrantRequest};

/// Decides from grants recorded against the value of one context
/// extension, e.g. organizational-unit policy under `org_unit` or feature
/// gates under `feature`.
#[derive(Debug, Clone)]
pub struct ExtensionGrantProvider {
    name: String,
    key: String,
    table: Arc<GrantTable>,
}

impl ExtensionGrantProvider {
    /// Create a provider named `name` reading the extension `key`.
    #[must_use]
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::with_table(name, key, Arc::new(GrantTable::new(SubjectScope::Permission)))
    }

    /// Like [`new`](Self::new), publishing table changes to `bus`.
    #[must_use]
    pub fn with_bus(name: impl Into<String>, key: impl Into<String>, bus: InvalidationBus) -> Self {
        Self::with_table(
            name,
            key,
            Arc::new(GrantTable::new(SubjectScope::Permission).with_bus(bus)),
        )
    }

    /// Create a provider over an existing table.
    #[must_use]
    pub fn with_table(
        name: impl Into<String>,
        key: impl Into<String>,
        table: Arc<GrantTable>,
    ) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            table,
        }
    }

    /// Organizational-unit policy (`"OrgUnit"`, reading `org_unit`).
    #[must_use]
    pub fn org_unit() -> Self {
        Self::new("OrgUnit", "org_unit")
    }

    /// Feature gates (`"Feature"`, reading `feature`).
    #[must_use]
    pub fn feature() -> Self {
        Self::new("Feature", "feature")
    }

    /// The extension key this provider reads.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The backing table, keyed by extension value.
    #[must_use]
    pub fn table(&self) -> &Arc<GrantTable> {
        &self.table
    }
}

#[async_trait]
impl GrantProvider for ExtensionGrantProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, request: &GrantRequest) -> ProviderResult<GrantOutcome> {
        let Some(value) = request.context.extension(&self.key) else {
            return Ok(GrantOutcome::undefined());
        };
        let state = self.table.get(value, request.permission_name());
        Ok(GrantOutcome {
            state,
            provider_key: (!state.is_undefined()).then(|| value.to_owned()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_core::{EvaluationContext, PermissionDefinition};

    fn request(ctx: EvaluationContext) -> GrantRequest {
        GrantRequest::new(Arc::new(PermissionDefinition::new("Reports.Export")), Arc::new(ctx))
    }

    #[tokio::test]
    async fn test_org_unit_policy() {
        let provider = ExtensionGrantProvider::org_unit();
        assert_eq!(provider.name(), "OrgUnit");
        provider.table().prohibit("contractors", "Reports.Export");

        let outcome = provider
            .check(&request(EvaluationContext::new().with_extension("org_unit", "contractors")))
            .await
            .unwrap();
        assert_eq!(outcome, GrantOutcome::prohibited("contractors"));

        let missing = provider.check(&request(EvaluationContext::new())).await.unwrap();
        assert_eq!(missing, GrantOutcome::undefined());
    }

    #[tokio::test]
    async fn test_custom_key() {
        let provider = ExtensionGrantProvider::new("Region", "region");
        provider.table().grant("eu", "Reports.Export");
        let outcome = provider
            .check(&request(EvaluationContext::new().with_extension("region", "eu")))
            .await
            .unwrap();
        assert!(outcome.state.is_granted());
        assert_eq!(provider.key(), "region");
    }
}
