//! Deep merge of TOML values.
//!
//! The merge operates on raw [`toml::Value`] trees rather than deserialized
//! structs. This correctly handles "absent vs default": a missing key in a
//! TOML table will not override the base layer.

mod deep;
mod types;

pub use deep::{deep_merge_tracking, record_defaults};
pub use types::{ConfigLayer, FieldSources};
