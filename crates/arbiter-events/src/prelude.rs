//! Prelude module - commonly used types for convenient import.
//!
//! Use `use arbiter_events::prelude::*;` to import all essential types.

// Bus
pub use crate::{DEFAULT_CHANNEL_CAPACITY, InvalidationBus, InvalidationReceiver};

// Events
pub use crate::{EventId, InvalidationEvent};

// Subscriber system
pub use crate::{FnSubscriber, InvalidationSubscriber, SubscriberId, SubscriberRegistry};
