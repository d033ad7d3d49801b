//! Convenience re-exports for tests.
//!
//! ```rust,ignore
//! use arbiter_test::prelude::*;
//! ```

pub use crate::fixtures::{test_catalog, test_context, test_permission};
pub use crate::harness::{TestHarness, TestHarnessBuilder, setup_test_logging};
pub use crate::mocks::{MockBehavior, MockGate, MockProvider};
