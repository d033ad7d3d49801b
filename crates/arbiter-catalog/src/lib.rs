//! Arbiter Catalog - The static registry of known permissions.
//!
//! This crate provides:
//! - [`PermissionCatalog`], an immutable name → definition map built once at
//!   startup and shared by `Arc`
//! - [`CatalogSource`], the bulk-loading contract, with an in-memory
//!   ([`StaticCatalogSource`]) and a TOML file ([`TomlCatalogSource`])
//!   implementation
//!
//! # Example
//!
//! ```
//! use arbiter_catalog::{CatalogError, PermissionCatalog};
//! use arbiter_core::PermissionDefinition;
//!
//! let catalog = PermissionCatalog::from_definitions(vec![
//!     PermissionDefinition::new("Orders"),
//!     PermissionDefinition::new("Orders.Create").with_parent("Orders"),
//!     PermissionDefinition::new("Orders.Purge").disabled(),
//! ])
//! .unwrap();
//!
//! assert!(catalog.get("Orders.Create").is_ok());
//! // Disabled permissions are unknown unless explicitly requested.
//! assert!(matches!(
//!     catalog.get("Orders.Purge"),
//!     Err(CatalogError::UnknownPermission { .. })
//! ));
//! assert!(catalog.get_including_disabled("Orders.Purge").is_ok());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod catalog;
mod error;
mod source;

pub use catalog::PermissionCatalog;
pub use error::{CatalogError, CatalogResult};
pub use source::{CatalogSource, StaticCatalogSource, TomlCatalogSource};
