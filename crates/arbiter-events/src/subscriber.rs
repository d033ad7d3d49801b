//! Synchronous subscriber registry.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{trace, warn};

use crate::event::InvalidationEvent;

/// Callback notified synchronously for every published event.
///
/// Implementations must not block for long: `publish` waits for every
/// subscriber before returning.
pub trait InvalidationSubscriber: Send + Sync {
    /// Handle one event.
    fn on_invalidation(&self, event: &InvalidationEvent);

    /// Subscriber name, for logs.
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// Handle returned by [`SubscriberRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type Entry = (SubscriberId, Arc<dyn InvalidationSubscriber>);

/// Ordered registry of synchronous subscribers.
///
/// Subscribers are notified in registration order. Notification works on a
/// snapshot taken under the read lock, so a subscriber may register or
/// unregister (itself or others) from inside its callback.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: RwLock<Vec<Entry>>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber.
    pub fn register(&self, subscriber: Arc<dyn InvalidationSubscriber>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        trace!(subscriber = subscriber.name(), %id, "registering invalidation subscriber");
        let mut subs = self.subscribers.write().unwrap_or_else(|e| {
            warn!("SubscriberRegistry lock poisoned, recovering");
            e.into_inner()
        });
        subs.push((id, subscriber));
        id
    }

    /// Remove a subscriber. Returns `true` if it was registered.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let removed = {
            let mut subs = self.subscribers.write().unwrap_or_else(|e| {
                warn!("SubscriberRegistry lock poisoned, recovering");
                e.into_inner()
            });
            subs.iter()
                .position(|(sid, _)| *sid == id)
                .map(|pos| subs.remove(pos))
        };
        // Dropped outside the lock: a subscriber's Drop may publish.
        removed.is_some()
    }

    /// Notify every subscriber of an event.
    pub fn notify(&self, event: &InvalidationEvent) {
        let snapshot: Vec<Arc<dyn InvalidationSubscriber>> = {
            let subs = self.subscribers.read().unwrap_or_else(|e| {
                warn!("SubscriberRegistry lock poisoned, recovering");
                e.into_inner()
            });
            subs.iter().map(|(_, s)| Arc::clone(s)).collect()
        };
        for subscriber in snapshot {
            subscriber.on_invalidation(event);
        }
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|e| {
                warn!("SubscriberRegistry lock poisoned, recovering");
                e.into_inner()
            })
            .len()
    }

    /// Whether no subscriber is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscribers", &self.len())
            .finish_non_exhaustive()
    }
}

/// Subscriber backed by a closure.
pub struct FnSubscriber<F> {
    name: String,
    callback: F,
}

impl<F> FnSubscriber<F>
where
    F: Fn(&InvalidationEvent) + Send + Sync,
{
    /// Wrap a closure.
    pub fn new(name: impl Into<String>, callback: F) -> Self {
        Self {
            name: name.into(),
            callback,
        }
    }
}

impl<F> InvalidationSubscriber for FnSubscriber<F>
where
    F: Fn(&InvalidationEvent) + Send + Sync,
{
    fn on_invalidation(&self, event: &InvalidationEvent) {
        (self.callback)(event);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_core::InvalidationTag;
    use std::sync::Mutex;

    #[test]
    fn test_register_and_notify_in_order() {
        let registry = SubscriberRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second"] {
            let seen = Arc::clone(&seen);
            registry.register(Arc::new(FnSubscriber::new(name, move |_| {
                seen.lock().unwrap().push(name);
            })));
        }

        registry.notify(&InvalidationEvent::all("test"));
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_len_survives_poisoned_lock() {
        let registry = Arc::new(SubscriberRegistry::new());
        registry.register(Arc::new(FnSubscriber::new("x", |_| {})));

        let poisoner = Arc::clone(&registry);
        let joined = std::thread::spawn(move || {
            let _guard = poisoner.subscribers.write().unwrap();
            panic!("poison the registry lock");
        })
        .join();
        assert!(joined.is_err());
        assert!(registry.subscribers.is_poisoned());

        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_unregister() {
        let registry = SubscriberRegistry::new();
        let id = registry.register(Arc::new(FnSubscriber::new("x", |_| {})));
        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_from_callback_does_not_deadlock() {
        struct SelfRemoving {
            registry: Arc<SubscriberRegistry>,
            id: Mutex<Option<SubscriberId>>,
        }

        impl InvalidationSubscriber for SelfRemoving {
            fn on_invalidation(&self, _event: &InvalidationEvent) {
                if let Some(id) = *self.id.lock().unwrap() {
                    self.registry.unregister(id);
                }
            }
        }

        let registry = Arc::new(SubscriberRegistry::new());
        let sub = Arc::new(SelfRemoving {
            registry: Arc::clone(&registry),
            id: Mutex::new(None),
        });
        let id = registry.register(Arc::clone(&sub) as Arc<dyn InvalidationSubscriber>);
        *sub.id.lock().unwrap() = Some(id);

        registry.notify(&InvalidationEvent::tag(InvalidationTag::user("u"), "t"));
        assert!(registry.is_empty());
    }
}
