//! Cache keys.

use arbiter_core::{ContextFingerprint, EvaluationContext, InvalidationTag};
use std::fmt;

/// Key of a cached decision: permission name plus context fingerprint.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    permission: String,
    fingerprint: ContextFingerprint,
}

impl CacheKey {
    /// Create a key.
    #[must_use]
    pub fn new(permission: impl Into<String>, fingerprint: ContextFingerprint) -> Self {
        Self {
            permission: permission.into(),
            fingerprint,
        }
    }

    /// Key for checking `permission` in `ctx`.
    #[must_use]
    pub fn for_check(permission: &str, ctx: &EvaluationContext) -> Self {
        Self::new(permission, ctx.fingerprint())
    }

    /// Tags a decision about `permission` in `ctx` is invalidated by.
    ///
    /// Always includes the permission tag, plus one tag per identity present
    /// in the context.
    #[must_use]
    pub fn tags_for(permission: &str, ctx: &EvaluationContext) -> Vec<InvalidationTag> {
        let mut tags = vec![InvalidationTag::permission(permission)];
        tags.extend(ctx.invalidation_tags());
        tags
    }

    /// The permission name.
    #[must_use]
    pub fn permission(&self) -> &str {
        &self.permission
    }

    /// The context fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> ContextFingerprint {
        self.fingerprint
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({}@{:?})", self.permission, self.fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_for() {
        let ctx = EvaluationContext::new().with_user("u1").with_tenant("t1");
        let tags = CacheKey::tags_for("P", &ctx);
        assert_eq!(
            tags,
            vec![
                InvalidationTag::permission("P"),
                InvalidationTag::user("u1"),
                InvalidationTag::tenant("t1"),
            ]
        );
    }

    #[test]
    fn test_keys_differ_by_context() {
        let a = CacheKey::for_check("P", &EvaluationContext::new().with_user("a"));
        let b = CacheKey::for_check("P", &EvaluationContext::new().with_user("b"));
        assert_ne!(a, b);
        assert_eq!(a.permission(), "P");
    }
}
