//! Check diagnostics and batch results.

use arbiter_core::{AggregateResult, ContextFingerprint};
use std::fmt;
use std::time::Duration;

/// How the cache took part in a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheStatus {
    /// Answered from the cache; no provider ran.
    Hit,
    /// Providers ran and the result was stored.
    Miss,
    /// Providers ran, but an invalidation landed meanwhile and the result
    /// was not stored.
    StaleStoreRejected,
    /// The engine has no cache.
    Disabled,
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hit => f.write_str("hit"),
            Self::Miss => f.write_str("miss"),
            Self::StaleStoreRejected => f.write_str("stale-store-rejected"),
            Self::Disabled => f.write_str("disabled"),
        }
    }
}

/// A check result together with how it was produced.
#[derive(Debug, Clone)]
pub struct CheckTrace {
    /// The decision.
    pub result: AggregateResult,
    /// Cache participation.
    pub cache: CacheStatus,
    /// Fingerprint of the evaluated context.
    pub fingerprint: ContextFingerprint,
    /// Wall time of the whole check.
    pub elapsed: Duration,
}

/// Results of a batch check, in input order.
#[derive(Debug, Clone, Default)]
pub struct MultipleAggregateResult {
    results: Vec<AggregateResult>,
}

impl MultipleAggregateResult {
    pub(crate) fn new(results: Vec<AggregateResult>) -> Self {
        Self { results }
    }

    /// Result for `permission`, if it was part of the batch.
    #[must_use]
    pub fn get(&self, permission: &str) -> Option<&AggregateResult> {
        self.results.iter().find(|r| r.permission == permission)
    }

    /// Whether `permission` was checked and granted.
    #[must_use]
    pub fn is_granted(&self, permission: &str) -> bool {
        self.get(permission).is_some_and(|r| r.granted)
    }

    /// Whether every permission in the batch was granted.
    ///
    /// An empty batch grants nothing, so this is `false` for it.
    #[must_use]
    pub fn all_granted(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(|r| r.granted)
    }

    /// Names of the granted permissions, in input order.
    pub fn granted(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|r| r.granted)
            .map(|r| r.permission.as_str())
    }

    /// Iterate results in input order.
    pub fn iter(&self) -> impl Iterator<Item = &AggregateResult> {
        self.results.iter()
    }

    /// Number of results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether the batch was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Take the results.
    #[must_use]
    pub fn into_inner(self) -> Vec<AggregateResult> {
        self.results
    }
}

impl IntoIterator for MultipleAggregateResult {
    type Item = AggregateResult;
    type IntoIter = std::vec::IntoIter<AggregateResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_core::GrantState;

    #[test]
    fn test_batch_queries() {
        let batch = MultipleAggregateResult::new(vec![
            AggregateResult::new("A", GrantState::Granted, Vec::new()),
            AggregateResult::new("B", GrantState::Undefined, Vec::new()),
        ]);
        assert!(batch.is_granted("A"));
        assert!(!batch.is_granted("B"));
        assert!(!batch.is_granted("C"));
        assert!(!batch.all_granted());
        assert_eq!(batch.granted().collect::<Vec<_>>(), vec!["A"]);
        assert!(!MultipleAggregateResult::default().all_granted());
    }
}
