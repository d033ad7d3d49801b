//! Reference grant providers over in-memory tables.
//!
//! Each provider reads one kind of evidence:
//!
//! | Provider | Name | Keyed by |
//! |----------|------|----------|
//! | [`UserGrantProvider`] | `User` | `user_id` |
//! | [`RoleGrantProvider`] | `Role` | roles of `user_id`, plus the `roles` extension |
//! | [`ClientGrantProvider`] | `Client` | `client_id` |
//! | [`ExtensionGrantProvider`] | configurable | one context extension |
//!
//! Tables can publish to an [`InvalidationBus`](arbiter_events::InvalidationBus)
//! so cached decisions are dropped as grants change.

mod client;
mod extension;
mod grant_table;
mod role;
mod user;

pub use client::{CLIENT_PROVIDER, ClientGrantProvider};
pub use extension::ExtensionGrantProvider;
pub use grant_table::{GrantTable, SubjectScope};
pub use role::{ROLE_PROVIDER, ROLES_EXTENSION, RoleGrantProvider, RoleMemberships};
pub use user::{USER_PROVIDER, UserGrantProvider};
