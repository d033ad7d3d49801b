//! Engine error types.

use thiserror::Error;

/// Errors a grant provider may return from a check.
///
/// For a non-critical provider every variant is absorbed into an
/// `Undefined` verdict; for a critical provider it fails the check.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The backing store is unreachable.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The backing store answered with an error.
    #[error("provider backend error: {0}")]
    Backend(String),

    /// The context lacks data the provider requires.
    #[error("invalid context: {0}")]
    InvalidContext(String),
}

/// Result type for provider checks.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors raised while assembling the provider registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A provider with this name is already registered.
    #[error("duplicate provider name: {name}")]
    DuplicateProviderName {
        /// The clashing name.
        name: String,
    },

    /// No provider with this name is registered.
    #[error("unknown provider: {name}")]
    UnknownProvider {
        /// The requested name.
        name: String,
    },

    /// Provider names must be non-empty.
    #[error("invalid provider name: {name:?}")]
    InvalidProviderName {
        /// The rejected name.
        name: String,
    },
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors a permission check can fail with.
///
/// None of these is ever converted into a permissive result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    /// The permission is not in the catalog (or is disabled).
    #[error("unknown permission: {name}")]
    UnknownPermission {
        /// The requested name.
        name: String,
    },

    /// A critical provider did not answer before the check deadline.
    #[error("critical provider {provider} timed out after {budget_ms}ms")]
    ProviderTimeout {
        /// The late provider.
        provider: String,
        /// Deadline budget in milliseconds.
        budget_ms: u64,
    },

    /// A critical provider returned an error or panicked.
    #[error("critical provider {provider} failed: {reason}")]
    CriticalProviderFailure {
        /// The failing provider.
        provider: String,
        /// Error description.
        reason: String,
    },

    /// Verdicts could not be collected.
    #[error("failed to aggregate verdicts: {0}")]
    AggregationFailure(String),

    /// The engine could not be assembled.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Result type for permission checks.
pub type ResolutionResult<T> = Result<T, ResolutionError>;
