//! `ARBITER_*` environment fallbacks.
//!
//! A variable only fills a field that no config file set; values still at
//! their embedded default count as unset.

use std::collections::HashMap;
use std::hash::BuildHasher;

use tracing::{debug, warn};

use crate::merge::{ConfigLayer, FieldSources};

#[derive(Clone, Copy)]
enum Kind {
    Integer,
    Text,
}

/// `(variable, dotted field, value kind)`.
const ENV_FIELDS: &[(&str, &str, Kind)] = &[
    ("ARBITER_LOG_LEVEL", "logging.level", Kind::Text),
    ("ARBITER_CHECK_DEADLINE_MS", "engine.check_deadline_ms", Kind::Integer),
    ("ARBITER_CACHE_CAPACITY", "cache.capacity", Kind::Integer),
];

/// Write every applicable variable in `env_vars` into `merged`, marking the
/// field as [`ConfigLayer::Environment`]. Returns how many were applied.
pub fn apply_env_fallbacks<S: BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut applied: usize = 0;

    for &(var, field, kind) in ENV_FIELDS {
        let set_by_file = sources
            .get(field)
            .is_some_and(|layer| *layer != ConfigLayer::Defaults);
        let Some(raw) = env_vars.get(var).filter(|_| !set_by_file) else {
            continue;
        };

        debug!(var, field, "config field taken from environment");
        if insert_dotted(merged, field, coerce(kind, raw)) {
            sources.insert(field.to_owned(), ConfigLayer::Environment);
            applied = applied.saturating_add(1);
        } else {
            warn!(var, field, "config field path is not a table, ignoring variable");
        }
    }

    applied
}

/// Integers that fail to parse stay strings so deserialization reports the
/// type error against the field.
fn coerce(kind: Kind, raw: &str) -> toml::Value {
    match kind {
        Kind::Integer => raw
            .trim()
            .parse::<i64>()
            .map_or_else(|_| toml::Value::String(raw.to_owned()), toml::Value::Integer),
        Kind::Text => toml::Value::String(raw.to_owned()),
    }
}

/// Insert `value` at `a.b.c`, creating intermediate tables. Returns `false`
/// if an intermediate node exists and is not a table.
fn insert_dotted(root: &mut toml::Value, path: &str, value: toml::Value) -> bool {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return false;
    };

    let mut node = root;
    for segment in segments {
        let Some(table) = node.as_table_mut() else {
            return false;
        };
        node = table
            .entry(segment)
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    match node.as_table_mut() {
        Some(table) => {
            table.insert(leaf.to_owned(), value);
            true
        },
        None => false,
    }
}

/// Snapshot of the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|&(k, v)| (k.to_owned(), v.to_owned()))
            .collect()
    }

    #[test]
    fn test_env_overrides_defaults_and_creates_tables() {
        let mut merged: toml::Value =
            toml::from_str("[engine]\ncheck_deadline_ms = 2000\n").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("engine.check_deadline_ms".to_owned(), ConfigLayer::Defaults);

        let applied = apply_env_fallbacks(
            &mut merged,
            &mut sources,
            &env(&[("ARBITER_CHECK_DEADLINE_MS", " 150 "), ("ARBITER_LOG_LEVEL", "debug")]),
        );

        assert_eq!(applied, 2);
        assert_eq!(merged["engine"]["check_deadline_ms"].as_integer(), Some(150));
        assert_eq!(merged["logging"]["level"].as_str(), Some("debug"));
        assert_eq!(sources.get("logging.level"), Some(&ConfigLayer::Environment));
    }

    #[test]
    fn test_file_value_is_kept() {
        let mut merged: toml::Value = toml::from_str("[cache]\ncapacity = 10\n").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("cache.capacity".to_owned(), ConfigLayer::Explicit);

        let env = env(&[("ARBITER_CACHE_CAPACITY", "99")]);
        let applied = apply_env_fallbacks(&mut merged, &mut sources, &env);
        assert_eq!(applied, 0);
        assert_eq!(merged["cache"]["capacity"].as_integer(), Some(10));
    }

    #[test]
    fn test_unparseable_integer_stays_text() {
        assert_eq!(coerce(Kind::Integer, "lots"), toml::Value::String("lots".to_owned()));
    }

    #[test]
    fn test_scalar_in_path_is_not_overwritten() {
        let mut merged: toml::Value = toml::from_str("cache = 3\n").unwrap();
        assert!(!insert_dotted(&mut merged, "cache.capacity", toml::Value::Integer(1)));
        assert_eq!(merged["cache"].as_integer(), Some(3));
    }
}
