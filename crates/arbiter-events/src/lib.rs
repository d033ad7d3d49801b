//! Arbiter Events - Invalidation bus for the Arbiter permission engine.
//!
//! This crate provides:
//! - [`InvalidationEvent`], the notice that grants behind a tag changed
//! - [`InvalidationBus`], a process-wide channel that delivers events to
//!   synchronous subscribers (caches) and async receivers (observers)
//! - [`SubscriberRegistry`] for callback-based subscribers
//!
//! # Delivery Order
//!
//! `publish` notifies every synchronous subscriber before it returns, and
//! only then broadcasts to async receivers. A grant mutation that publishes
//! an invalidation as part of its own operation therefore knows that every
//! attached cache has evicted the affected entries by the time it proceeds.
//!
//! # Example
//!
//! ```rust
//! use arbiter_core::InvalidationTag;
//! use arbiter_events::InvalidationBus;
//!
//! # async fn example() {
//! let bus = InvalidationBus::new();
//! let mut receiver = bus.subscribe();
//!
//! bus.invalidate(InvalidationTag::user("u1"), "role assignment changed");
//!
//! let event = receiver.recv().await.unwrap();
//! assert_eq!(event.tag, Some(InvalidationTag::user("u1")));
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod bus;
mod event;
mod subscriber;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, InvalidationBus, InvalidationReceiver};
pub use event::{EventId, InvalidationEvent};
pub use subscriber::{
    FnSubscriber, InvalidationSubscriber, SubscriberId, SubscriberRegistry,
};
