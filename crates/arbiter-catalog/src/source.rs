//! Catalog sources: where permission definitions come from.

use arbiter_core::PermissionDefinition;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{CatalogError, CatalogResult};

/// Maximum allowed catalog file size (4 MB).
const MAX_CATALOG_FILE_SIZE: u64 = 4 * 1_048_576;

/// Bulk loader for permission definitions.
///
/// Implementations read from configuration or storage owned by the host
/// application. The catalog calls [`load`](Self::load) exactly once, at
/// construction.
pub trait CatalogSource: Send + Sync {
    /// Produce every definition the catalog should contain.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read or parsed.
    fn load(&self) -> CatalogResult<Vec<PermissionDefinition>>;

    /// Short description used in logs.
    fn describe(&self) -> String;
}

/// In-memory catalog source.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalogSource {
    definitions: Vec<PermissionDefinition>,
}

impl StaticCatalogSource {
    /// Create a source from a fixed list.
    #[must_use]
    pub fn new(definitions: Vec<PermissionDefinition>) -> Self {
        Self { definitions }
    }
}

impl CatalogSource for StaticCatalogSource {
    fn load(&self) -> CatalogResult<Vec<PermissionDefinition>> {
        Ok(self.definitions.clone())
    }

    fn describe(&self) -> String {
        "static".to_owned()
    }
}

/// On-disk layout of a TOML catalog.
///
/// ```toml
/// [[permission]]
/// name = "Orders"
///
/// [[permission]]
/// name = "Orders.Create"
/// parent = "Orders"
/// display_name = "Create orders"
/// ```
#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "permission")]
    permissions: Vec<PermissionDefinition>,
}

/// Catalog source backed by a TOML file.
#[derive(Debug, Clone)]
pub struct TomlCatalogSource {
    path: PathBuf,
}

impl TomlCatalogSource {
    /// Create a source reading the given file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse catalog TOML from a string.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ParseError`] if the text is not a valid catalog.
    pub fn parse(content: &str, origin: &str) -> CatalogResult<Vec<PermissionDefinition>> {
        let file: CatalogFile = toml::from_str(content).map_err(|e| CatalogError::ParseError {
            path: origin.to_owned(),
            source: e,
        })?;
        Ok(file.permissions)
    }
}

impl CatalogSource for TomlCatalogSource {
    fn load(&self) -> CatalogResult<Vec<PermissionDefinition>> {
        let display = self.path.display().to_string();
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| CatalogError::ReadError {
                path: display.clone(),
                source: e,
            })?;

        // Check size after reading to avoid TOCTOU between stat and read.
        if content.len() as u64 > MAX_CATALOG_FILE_SIZE {
            return Err(CatalogError::InvalidDefinition(format!(
                "catalog file {display} is {} bytes, over the {MAX_CATALOG_FILE_SIZE} byte limit",
                content.len()
            )));
        }

        Self::parse(&content, &display)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
