//! Invalidation events.

use arbiter_core::InvalidationTag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier of a published event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Generate a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notice that grants behind a tag changed and cached decisions are stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationEvent {
    /// Event id.
    pub id: EventId,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
    /// Affected tag. `None` invalidates every cached decision.
    pub tag: Option<InvalidationTag>,
    /// What changed, for audit logs.
    pub reason: String,
}

impl InvalidationEvent {
    /// Invalidate every decision carrying `tag`.
    #[must_use]
    pub fn tag(tag: InvalidationTag, reason: impl Into<String>) -> Self {
        Self {
            id: EventId::new(),
            timestamp: Utc::now(),
            tag: Some(tag),
            reason: reason.into(),
        }
    }

    /// Invalidate every cached decision.
    #[must_use]
    pub fn all(reason: impl Into<String>) -> Self {
        Self {
            id: EventId::new(),
            timestamp: Utc::now(),
            tag: None,
            reason: reason.into(),
        }
    }

    /// Whether the event clears everything.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.tag.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_constructors() {
        let event = InvalidationEvent::tag(InvalidationTag::tenant("acme"), "deactivated");
        assert!(!event.is_global());
        assert_eq!(event.reason, "deactivated");

        let all = InvalidationEvent::all("catalog reload");
        assert!(all.is_global());
        assert_ne!(event.id, all.id);
    }

    #[test]
    fn test_event_serialization() {
        let event = InvalidationEvent::tag(InvalidationTag::user("u1"), "grant edited");
        let json = serde_json::to_string(&event).unwrap();
        let back: InvalidationEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
