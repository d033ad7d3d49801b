//! Arbiter Core - Shared types for the Arbiter permission resolution engine.
//!
//! This crate provides:
//! - [`PermissionDefinition`], the catalog entry for a named permission
//! - [`EvaluationContext`], the principal a check is evaluated for, and its
//!   stable [`ContextFingerprint`]
//! - [`GrantState`] / [`GrantVerdict`], the tri-state opinion of one provider
//! - [`AggregateResult`], the combined decision of all providers
//! - [`InvalidationTag`], the key used to evict cached decisions
//!
//! # Example
//!
//! ```
//! use arbiter_core::{EvaluationContext, InvalidationTag};
//!
//! let ctx = EvaluationContext::new()
//!     .with_user("u1")
//!     .with_tenant("acme")
//!     .with_extension("org_unit", "sales");
//!
//! // Equal contexts always reduce to the same fingerprint.
//! let same = EvaluationContext::new()
//!     .with_extension("org_unit", "sales")
//!     .with_tenant("acme")
//!     .with_user("u1");
//! assert_eq!(ctx.fingerprint(), same.fingerprint());
//!
//! assert!(ctx.invalidation_tags().contains(&InvalidationTag::user("u1")));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod permission;
mod tag;
mod verdict;

pub use context::{ContextFingerprint, EvaluationContext};
pub use permission::PermissionDefinition;
pub use tag::{InvalidationTag, ParseTagError};
pub use verdict::{AggregateResult, GrantState, GrantVerdict, VerdictFailure};
