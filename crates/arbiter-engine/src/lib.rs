//! Arbiter Engine - Resolve permission checks against pluggable providers.
//!
//! This crate provides:
//! - [`GrantProvider`], the contract for an independent source of evidence
//! - [`ProviderRegistry`], the ordered provider set assembled at startup
//! - [`ResolutionEngine`], which fans a check out to every provider under a
//!   single deadline, combines the verdicts, and caches the decision
//! - [`combine`], the combination policy: prohibit overrides grant, grant
//!   overrides silence, silence denies
//! - Reference providers over in-memory grant tables in [`providers`]
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use arbiter_catalog::PermissionCatalog;
//! use arbiter_core::{EvaluationContext, PermissionDefinition};
//! use arbiter_engine::providers::RoleGrantProvider;
//! use arbiter_engine::{EngineOptions, ProviderRegistry, ResolutionEngine};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let catalog = PermissionCatalog::from_definitions(vec![
//!     PermissionDefinition::new("Orders.Create"),
//! ])
//! .unwrap();
//!
//! let roles = RoleGrantProvider::new();
//! roles.memberships().assign("u1", "clerk");
//! roles.grants().grant("clerk", "Orders.Create");
//!
//! let mut registry = ProviderRegistry::new();
//! registry.register(roles).unwrap();
//!
//! let engine = ResolutionEngine::new(Arc::new(catalog), registry, EngineOptions::default());
//! let ctx = EvaluationContext::new().with_user("u1");
//! assert!(engine.is_granted("Orders.Create", &ctx).await.unwrap());
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config_bridge;
pub mod prelude;
pub mod providers;

mod engine;
mod error;
mod policy;
mod provider;
mod registry;
mod trace;

pub use engine::{DEFAULT_CHECK_DEADLINE, EngineOptions, ResolutionEngine};
pub use error::{
    ProviderError, ProviderResult, RegistryError, RegistryResult, ResolutionError,
    ResolutionResult,
};
pub use policy::combine;
pub use provider::{GrantOutcome, GrantProvider, GrantRequest};
pub use registry::{ProviderRegistry, RegisteredProvider};
pub use trace::{CacheStatus, CheckTrace, MultipleAggregateResult};
