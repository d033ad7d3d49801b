//! Prelude module - commonly used types for convenient import.
//!
//! Use `use arbiter_engine::prelude::*;` to import all essential types.

// Engine
pub use crate::{EngineOptions, ResolutionEngine};

// Providers
pub use crate::{GrantOutcome, GrantProvider, GrantRequest, ProviderRegistry};

// Results
pub use crate::{CacheStatus, CheckTrace, MultipleAggregateResult};

// Errors
pub use crate::{ProviderError, ProviderResult, RegistryError, ResolutionError, ResolutionResult};
