//! Prelude module - commonly used types for convenient import.
//!
//! Use `use arbiter_core::prelude::*;` to import all essential types.

// Permissions
pub use crate::PermissionDefinition;

// Contexts
pub use crate::{ContextFingerprint, EvaluationContext, InvalidationTag};

// Verdicts
pub use crate::{AggregateResult, GrantState, GrantVerdict, VerdictFailure};
