//! The resolved configuration and its provenance.

use crate::merge::{ConfigLayer, FieldSources};
use crate::types::Config;

/// A resolved configuration together with source annotations.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final merged configuration.
    pub config: Config,
    /// Dotted field path → which layer set the value.
    pub field_sources: FieldSources,
    /// Config file paths that were loaded (in precedence order).
    pub loaded_files: Vec<String>,
}

impl ResolvedConfig {
    /// Which layer set a dotted field path, e.g. `"cache.capacity"`.
    #[must_use]
    pub fn source_of(&self, field: &str) -> Option<&ConfigLayer> {
        self.field_sources.get(field)
    }

    /// Render the resolved configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&self.config)
    }
}
