//! Provider verdicts and aggregate results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Tri-state outcome of one provider's evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantState {
    /// The provider grants the permission.
    Granted,
    /// The provider explicitly forbids the permission.
    Prohibited,
    /// The provider has no opinion.
    #[default]
    Undefined,
}

impl GrantState {
    /// Whether this state is [`GrantState::Granted`].
    #[must_use]
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }

    /// Whether this state is [`GrantState::Prohibited`].
    #[must_use]
    pub fn is_prohibited(self) -> bool {
        matches!(self, Self::Prohibited)
    }

    /// Whether this state is [`GrantState::Undefined`].
    #[must_use]
    pub fn is_undefined(self) -> bool {
        matches!(self, Self::Undefined)
    }
}

impl fmt::Display for GrantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Granted => f.write_str("granted"),
            Self::Prohibited => f.write_str("prohibited"),
            Self::Undefined => f.write_str("undefined"),
        }
    }
}

/// Why a verdict was synthesized instead of answered by its provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerdictFailure {
    /// The provider returned an error or panicked.
    Failed {
        /// Error description.
        reason: String,
    },
    /// The provider did not answer before the check deadline.
    TimedOut {
        /// Deadline budget in milliseconds.
        budget_ms: u64,
    },
}

impl fmt::Display for VerdictFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "failed: {reason}"),
            Self::TimedOut { budget_ms } => write!(f, "timed out after {budget_ms}ms"),
        }
    }
}

/// One provider's opinion on a permission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantVerdict {
    /// Name of the issuing provider.
    pub provider: String,
    /// The opinion.
    pub state: GrantState,
    /// Provider-specific key that produced the opinion (e.g. a role name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_key: Option<String>,
    /// Set when the verdict stands in for a failed or late provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<VerdictFailure>,
    /// Time the provider took to answer.
    #[serde(default)]
    pub elapsed: Duration,
}

impl GrantVerdict {
    /// Create an answered verdict.
    #[must_use]
    pub fn new(provider: impl Into<String>, state: GrantState) -> Self {
        Self {
            provider: provider.into(),
            state,
            provider_key: None,
            failure: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Create an `Undefined` verdict standing in for a failed provider.
    #[must_use]
    pub fn failed(provider: impl Into<String>, failure: VerdictFailure) -> Self {
        Self {
            provider: provider.into(),
            state: GrantState::Undefined,
            provider_key: None,
            failure: Some(failure),
            elapsed: Duration::ZERO,
        }
    }

    /// Attach the provider key.
    #[must_use]
    pub fn with_provider_key(mut self, key: Option<String>) -> Self {
        self.provider_key = key;
        self
    }

    /// Record the time the provider took.
    #[must_use]
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// Whether the verdict was synthesized from a failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// The engine's combined decision for one permission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Permission that was checked.
    pub permission: String,
    /// Final decision. `Undefined` collapses to `false`.
    pub granted: bool,
    /// The state the combination policy settled on.
    pub decision: GrantState,
    /// Contributing verdicts, in provider registration order.
    pub verdicts: Vec<GrantVerdict>,
    /// When the verdicts were combined.
    pub evaluated_at: DateTime<Utc>,
}

impl AggregateResult {
    /// Build a result from the decided state and its verdicts.
    #[must_use]
    pub fn new(
        permission: impl Into<String>,
        decision: GrantState,
        verdicts: Vec<GrantVerdict>,
    ) -> Self {
        Self {
            permission: permission.into(),
            granted: decision.is_granted(),
            decision,
            verdicts,
            evaluated_at: Utc::now(),
        }
    }

    /// Verdicts that stand in for failed or late providers.
    pub fn failures(&self) -> impl Iterator<Item = &GrantVerdict> {
        self.verdicts.iter().filter(|v| v.is_failure())
    }

    /// Find the verdict issued by a provider.
    #[must_use]
    pub fn verdict_of(&self, provider: &str) -> Option<&GrantVerdict> {
        self.verdicts.iter().find(|v| v.provider == provider)
    }
}
