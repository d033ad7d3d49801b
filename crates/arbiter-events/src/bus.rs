//! Invalidation bus for broadcasting events to subscribers.

use arbiter_core::InvalidationTag;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::event::InvalidationEvent;
use crate::subscriber::SubscriberRegistry;

/// Default channel capacity for the async side of the bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Process-wide invalidation channel.
///
/// Synchronous subscribers (caches) are notified first, inside `publish`;
/// async receivers (audit sinks, metrics) get the event afterwards through a
/// broadcast channel. Clones share both the sender and the registry.
#[derive(Debug)]
pub struct InvalidationBus {
    sender: broadcast::Sender<Arc<InvalidationEvent>>,
    registry: Arc<SubscriberRegistry>,
    capacity: usize,
}

impl InvalidationBus {
    /// Create a new bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new bus with the given async channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            registry: Arc::new(SubscriberRegistry::new()),
            capacity: capacity.max(1),
        }
    }

    /// Publish an event.
    ///
    /// Every synchronous subscriber has handled the event when this returns.
    /// Returns the number of async receivers the event was delivered to.
    pub fn publish(&self, event: InvalidationEvent) -> usize {
        let event = Arc::new(event);

        debug!(
            event_id = %event.id,
            tag = ?event.tag,
            reason = %event.reason,
            "Publishing invalidation"
        );

        self.registry.notify(&event);

        if let Ok(count) = self.sender.send(Arc::clone(&event)) {
            trace!(event_id = %event.id, receiver_count = count, "Invalidation broadcast");
            count
        } else {
            // No async receivers - this is fine
            0
        }
    }

    /// Invalidate every decision carrying `tag`.
    pub fn invalidate(&self, tag: InvalidationTag, reason: impl Into<String>) -> usize {
        self.publish(InvalidationEvent::tag(tag, reason))
    }

    /// Invalidate every cached decision.
    pub fn invalidate_all(&self, reason: impl Into<String>) -> usize {
        self.publish(InvalidationEvent::all(reason))
    }

    /// Subscribe to events asynchronously.
    #[must_use]
    pub fn subscribe(&self) -> InvalidationReceiver {
        InvalidationReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// The synchronous subscriber registry.
    #[must_use]
    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    /// Number of async receivers plus synchronous subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender
            .receiver_count()
            .saturating_add(self.registry.len())
    }

    /// Async channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InvalidationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InvalidationBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            registry: Arc::clone(&self.registry),
            capacity: self.capacity,
        }
    }
}

/// Async receiver for invalidation events.
pub struct InvalidationReceiver {
    receiver: broadcast::Receiver<Arc<InvalidationEvent>>,
}

impl InvalidationReceiver {
    /// Receive the next event.
    ///
    /// Lagging receivers skip the dropped events with a warning. Returns
    /// `None` once every bus handle is gone.
    pub async fn recv(&mut self) -> Option<Arc<InvalidationEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(skipped = count, "Invalidation receiver lagged, events dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receive the next event without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<InvalidationEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(skipped = count, "Invalidation receiver lagged, events dropped");
                },
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }
}
