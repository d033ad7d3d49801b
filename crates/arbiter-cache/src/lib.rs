//! Arbiter Cache - Memoized permission decisions with eager invalidation.
//!
//! This crate provides [`ResultCache`], a bounded LRU map from
//! `(permission, context fingerprint)` to [`AggregateResult`] with:
//!
//! - **Tag-based invalidation**: every entry carries the tags of the
//!   principals it was computed for; [`ResultCache::invalidate`] evicts all
//!   entries sharing a tag before it returns.
//! - **Invalidate-wins ordering**: a store computed against state that has
//!   since been invalidated is rejected. Callers take a [`CacheTicket`]
//!   before evaluating and hand it back to [`ResultCache::store`]; each tag
//!   has a generation counter that invalidation bumps, and a ticket with a
//!   stale generation cannot write.
//! - **LRU bound** as a safety valve independent of invalidation, plus an
//!   optional entry TTL.
//!
//! # Example
//!
//! ```
//! use arbiter_cache::{CacheConfig, CacheKey, ResultCache};
//! use arbiter_core::{AggregateResult, EvaluationContext, GrantState, InvalidationTag};
//!
//! let cache = ResultCache::new(CacheConfig::default());
//! let ctx = EvaluationContext::new().with_user("u1");
//! let key = CacheKey::new("Orders.Create", ctx.fingerprint());
//!
//! let ticket = cache.ticket(CacheKey::tags_for("Orders.Create", &ctx));
//! let result = AggregateResult::new("Orders.Create", GrantState::Granted, Vec::new());
//! assert!(cache.store(key.clone(), result, ticket));
//! assert!(cache.lookup(&key).is_some());
//!
//! cache.invalidate(&InvalidationTag::user("u1"));
//! assert!(cache.lookup(&key).is_none());
//! ```
//!
//! [`AggregateResult`]: arbiter_core::AggregateResult

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod cache;
mod key;
mod stats;

pub use cache::{CacheConfig, CacheTicket, DEFAULT_CACHE_CAPACITY, ResultCache};
pub use key::CacheKey;
pub use stats::CacheStats;
