//! Arbiter Test - Shared test utilities for the Arbiter engine.
//!
//! This crate provides a scriptable [`MockProvider`], catalog and context
//! fixtures, and a [`TestHarness`] that wires an engine to an invalidation
//! bus. Use it as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! arbiter-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use arbiter_core::GrantState;
//! use arbiter_test::{MockProvider, TestHarness, test_context};
//!
//! #[tokio::test]
//! async fn test_grant() {
//!     let user = MockProvider::new("User").with_state(GrantState::Granted);
//!     let harness = TestHarness::builder().with_provider(user.clone()).build();
//!
//!     assert!(harness.engine.is_granted("Orders.Create", &test_context()).await.unwrap());
//!     assert_eq!(user.calls(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
