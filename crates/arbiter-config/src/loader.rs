//! Layered loading.
//!
//! Precedence, lowest first:
//!
//! | Layer | Source | Missing file |
//! |-------|--------|--------------|
//! | `Defaults` | embedded `defaults.toml` | n/a |
//! | `System` | `/etc/arbiter/config.toml` | skipped |
//! | `User` | `~/.arbiter/config.toml` (or the home override) | skipped |
//! | `Explicit` | the path passed by the caller | error |
//! | `Environment` | `ARBITER_*` variables, only for fields no file set | n/a |
//!
//! The merged tree is deserialized and validated once, at the end.

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_defaults};
use crate::show::ResolvedConfig;
use crate::types::Config;
use crate::validate;

const DEFAULTS_TOML: &str = include_str!("defaults.toml");

const SYSTEM_CONFIG: &str = "/etc/arbiter/config.toml";

/// Largest config file accepted, in bytes.
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// One file-backed layer.
struct FileLayer {
    layer: ConfigLayer,
    path: PathBuf,
    required: bool,
}

/// Load every layer, reading `ARBITER_*` variables from the process.
///
/// `arbiter_home_override` replaces `~/.arbiter` as the directory holding
/// the user `config.toml`.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a file is unreadable or malformed, the
/// explicit file does not exist, or the merged result fails validation.
pub fn load(
    explicit_file: Option<&Path>,
    arbiter_home_override: Option<&Path>,
) -> ConfigResult<ResolvedConfig> {
    load_with_env(explicit_file, arbiter_home_override, &collect_env_vars())
}

/// [`load`] against a caller-supplied environment.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env<S: BuildHasher>(
    explicit_file: Option<&Path>,
    arbiter_home_override: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    let mut merged = parse(DEFAULTS_TOML, "<embedded defaults>")?;
    let mut field_sources = FieldSources::new();
    record_defaults(&merged, &mut field_sources);

    let mut loaded_files = Vec::new();
    for file in file_layers(explicit_file, arbiter_home_override)? {
        let overlay = if file.required {
            read_file(&file.path)?
        } else if let Some(overlay) = try_load_file(&file.path)? {
            overlay
        } else {
            continue;
        };

        deep_merge_tracking(&mut merged, &overlay, "", &file.layer, &mut field_sources);
        info!(layer = %file.layer, path = %file.path.display(), "merged config file");
        loaded_files.push(file.path.display().to_string());
    }

    let applied = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars);
    if applied > 0 {
        debug!(applied, "environment filled unset fields");
    }

    let config = into_config(merged, "<merged config>")?;
    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Load exactly one file over the built-in defaults of each section.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is unreadable, malformed, or
/// invalid.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    into_config(read_file(path)?, &path.display().to_string())
}

fn file_layers(
    explicit_file: Option<&Path>,
    arbiter_home_override: Option<&Path>,
) -> ConfigResult<Vec<FileLayer>> {
    let user_dir = match arbiter_home_override {
        Some(dir) => dir.to_path_buf(),
        None => home_directory()?.join(".arbiter"),
    };

    let mut layers = vec![
        FileLayer {
            layer: ConfigLayer::System,
            path: PathBuf::from(SYSTEM_CONFIG),
            required: false,
        },
        FileLayer {
            layer: ConfigLayer::User,
            path: user_dir.join("config.toml"),
            required: false,
        },
    ];
    if let Some(path) = explicit_file {
        layers.push(FileLayer {
            layer: ConfigLayer::Explicit,
            path: path.to_path_buf(),
            required: true,
        });
    }
    Ok(layers)
}

fn parse(content: &str, origin: &str) -> ConfigResult<toml::Value> {
    toml::from_str(content).map_err(|source| ConfigError::ParseError {
        path: origin.to_owned(),
        source,
    })
}

fn into_config(value: toml::Value, origin: &str) -> ConfigResult<Config> {
    let config: Config = value
        .try_into()
        .map_err(|source| ConfigError::ParseError {
            path: origin.to_owned(),
            source,
        })?;
    validate::validate(&config)?;
    Ok(config)
}

/// [`read_file`], with a missing file reported as `None`.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    match read_file(path) {
        Err(ConfigError::ReadError { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            debug!(path = %path.display(), "no config file here");
            Ok(None)
        },
        other => other.map(Some),
    }
}

/// Read and parse `path`. The size limit is checked on the bytes actually
/// read, not on a prior stat.
fn read_file(path: &Path) -> ConfigResult<toml::Value> {
    let origin = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: origin.clone(),
        source,
    })?;

    let size = u64::try_from(content.len()).unwrap_or(u64::MAX);
    if size > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: origin,
            message: format!("{size} bytes exceeds the {MAX_CONFIG_FILE_SIZE} byte limit"),
        });
    }

    parse(&content, &origin)
}

fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}
