//! Catalog error types.

use thiserror::Error;

/// Errors raised while building or querying the permission catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The permission is not registered, or is disabled.
    #[error("unknown permission: {name}")]
    UnknownPermission {
        /// The requested name.
        name: String,
    },

    /// Two definitions share a name.
    #[error("duplicate permission definition: {name}")]
    DuplicatePermission {
        /// The duplicated name.
        name: String,
    },

    /// A definition names a parent that is not in the catalog.
    #[error("permission {name} references missing parent {parent}")]
    MissingParent {
        /// The child permission.
        name: String,
        /// The missing parent.
        parent: String,
    },

    /// Parent links form a cycle.
    #[error("permission parent cycle through {name}")]
    ParentCycle {
        /// A permission on the cycle.
        name: String,
    },

    /// A definition is malformed (e.g. empty name).
    #[error("invalid permission definition: {0}")]
    InvalidDefinition(String),

    /// A catalog file could not be read.
    #[error("failed to read catalog {path}: {source}")]
    ReadError {
        /// File path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A catalog file could not be parsed.
    #[error("failed to parse catalog {path}: {source}")]
    ParseError {
        /// File path.
        path: String,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;
