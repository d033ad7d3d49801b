//! Subscriber construction.
//!
//! A [`LogConfig`] becomes exactly one `fmt` layer behind one `EnvFilter`.
//! The layer is boxed so that every format/target combination shares a
//! single install path.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{self, MakeWriter, format::FmtSpan};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::{TelemetryError, TelemetryResult};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// How often a file target starts a new file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRotation {
    /// One file per day.
    #[default]
    Daily,
    /// One file per hour.
    Hourly,
    /// One file per minute. Only useful in tests.
    Minutely,
    /// A single, ever-growing file.
    Never,
}

impl FileRotation {
    fn rotation(self) -> Rotation {
        match self {
            Self::Daily => Rotation::DAILY,
            Self::Hourly => Rotation::HOURLY,
            Self::Minutely => Rotation::MINUTELY,
            Self::Never => Rotation::NEVER,
        }
    }
}

/// Event rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, indented fields.
    #[default]
    Pretty,
    /// One abbreviated line per event.
    Compact,
    /// One JSON object per event.
    Json,
    /// One line per event with every span field.
    Full,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            "full" => Ok(Self::Full),
            _ => Err(TelemetryError::ConfigError(format!(
                "log format must be pretty, compact, json or full, got '{s}'"
            ))),
        }
    }
}

/// Where events are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Standard output.
    Stdout,
    /// Standard error.
    #[default]
    Stderr,
    /// Rolling files in this directory, named per [`FileLogConfig`].
    File(PathBuf),
}

/// Naming and retention for [`LogTarget::File`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLogConfig {
    /// File name prefix; files are named `<prefix>.<period>.log`.
    pub prefix: String,
    /// Rotation period.
    pub rotation: FileRotation,
    /// Rotated files to keep. `0` keeps all of them.
    pub max_files: usize,
}

impl Default for FileLogConfig {
    fn default() -> Self {
        Self {
            prefix: "arbiter".to_owned(),
            rotation: FileRotation::Daily,
            max_files: 0,
        }
    }
}

/// Everything [`setup_logging`] needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Base filter, in `EnvFilter` syntax (`"info"`, `"warn,arbiter_cache=debug"`).
    pub level: String,
    /// Extra filter directives layered over `level`.
    pub directives: Vec<String>,
    /// Rendering.
    pub format: LogFormat,
    /// Destination.
    pub target: LogTarget,
    /// File naming, used only with [`LogTarget::File`].
    pub file: FileLogConfig,
    /// Prefix events with a timestamp.
    pub timestamps: bool,
    /// Include the source file and line of each event.
    pub source_location: bool,
    /// Emit an event when each span opens and closes, which yields a
    /// timed pair per permission check and per provider call.
    pub span_events: bool,
    /// Colorize output. Never applied to JSON.
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            directives: Vec::new(),
            format: LogFormat::Pretty,
            target: LogTarget::Stderr,
            file: FileLogConfig::default(),
            timestamps: true,
            source_location: false,
            span_events: false,
            ansi: true,
        }
    }
}

impl LogConfig {
    /// Defaults with the given base filter.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Self::default()
        }
    }

    /// Translate the `[logging]` section of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::ConfigError`] for an unknown format.
    #[cfg(feature = "config")]
    pub fn from_section(section: &arbiter_config::LoggingSection) -> TelemetryResult<Self> {
        Ok(Self {
            level: section.level.clone(),
            directives: section.directives.clone(),
            format: section.format.parse()?,
            ..Self::default()
        })
    }

    /// Use `format`.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Write to `target`.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Write rolling files into `directory`. Colors are turned off.
    #[must_use]
    pub fn in_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.target = LogTarget::File(directory.into());
        self.ansi = false;
        self
    }

    /// Replace the file naming and retention settings.
    #[must_use]
    pub fn with_file_config(mut self, file: FileLogConfig) -> Self {
        self.file = file;
        self
    }

    /// Layer `directive` over the base filter.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Drop timestamps, for collectors that stamp lines themselves.
    #[must_use]
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    /// Include source locations.
    #[must_use]
    pub fn with_source_location(mut self) -> Self {
        self.source_location = true;
        self
    }

    /// Log span open/close.
    #[must_use]
    pub fn with_span_events(mut self) -> Self {
        self.span_events = true;
        self
    }

    /// Turn colors off.
    #[must_use]
    pub fn without_ansi(mut self) -> Self {
        self.ansi = false;
        self
    }

    fn filter(&self) -> TelemetryResult<EnvFilter> {
        let invalid = |e: &dyn std::fmt::Display| TelemetryError::ConfigError(e.to_string());
        let base = EnvFilter::try_new(&self.level).map_err(|e| invalid(&e))?;

        self.directives.iter().try_fold(base, |filter, d| {
            d.parse()
                .map(|directive| filter.add_directive(directive))
                .map_err(|e: tracing_subscriber::filter::ParseError| invalid(&e))
        })
    }

    fn layer_for<W>(&self, writer: W) -> BoxedLayer
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let spans = if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let base = fmt::layer::<Registry>()
            .with_writer(writer)
            .with_ansi(self.ansi && self.format != LogFormat::Json)
            .with_file(self.source_location)
            .with_line_number(self.source_location)
            .with_span_events(spans);

        match (self.format, self.timestamps) {
            (LogFormat::Pretty, true) => base.pretty().boxed(),
            (LogFormat::Pretty, false) => base.pretty().without_time().boxed(),
            (LogFormat::Compact, true) => base.compact().boxed(),
            (LogFormat::Compact, false) => base.compact().without_time().boxed(),
            (LogFormat::Json, true) => base.json().boxed(),
            (LogFormat::Json, false) => base.json().without_time().boxed(),
            (LogFormat::Full, true) => base.boxed(),
            (LogFormat::Full, false) => base.without_time().boxed(),
        }
    }

    fn layer(&self) -> TelemetryResult<BoxedLayer> {
        let dir = match &self.target {
            LogTarget::Stdout => return Ok(self.layer_for(std::io::stdout)),
            LogTarget::Stderr => return Ok(self.layer_for(std::io::stderr)),
            LogTarget::File(dir) => dir,
        };

        std::fs::create_dir_all(dir)?;
        let mut appender = RollingFileAppender::builder()
            .rotation(self.file.rotation.rotation())
            .filename_prefix(self.file.prefix.clone())
            .filename_suffix("log");
        if self.file.max_files > 0 {
            appender = appender.max_log_files(self.file.max_files);
        }
        let appender = appender
            .build(dir)
            .map_err(|e| TelemetryError::InitError(e.to_string()))?;
        Ok(self.layer_for(appender))
    }
}

/// Install `config` as the process-wide subscriber.
///
/// # Errors
///
/// [`TelemetryError::ConfigError`] for a bad filter,
/// [`TelemetryError::IoError`] if the log directory cannot be created, and
/// [`TelemetryError::InitError`] if a subscriber is already installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.filter()?;
    let layer = config.layer()?.with_filter(filter);
    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| TelemetryError::InitError(e.to_string()))
}

/// [`setup_logging`] with [`LogConfig::default`].
///
/// # Errors
///
/// See [`setup_logging`].
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_write_pretty_to_stderr() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.target, LogTarget::Stderr);
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.file.prefix, "arbiter");
        assert!(config.ansi && config.timestamps);
    }

    #[test]
    fn test_builders_compose() {
        let config = LogConfig::new("warn")
            .with_format(LogFormat::Compact)
            .with_directive("arbiter_engine=debug")
            .with_source_location()
            .without_timestamps();

        assert_eq!(config.directives, ["arbiter_engine=debug"]);
        assert!(config.source_location);
        assert!(!config.timestamps);
        assert!(config.filter().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let parsed: LogConfig =
            serde_json::from_str(r#"{"level":"trace","format":"full"}"#).unwrap();
        assert_eq!(parsed.level, "trace");
        assert_eq!(parsed.format, LogFormat::Full);
        assert_eq!(parsed.target, LogTarget::Stderr);
        assert!(parsed.ansi);

        let round = serde_json::to_value(&parsed).unwrap();
        assert_eq!(round["format"], "full");
    }

    #[test]
    fn test_format_names() {
        assert_eq!(" JSON ".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("logfmt".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_malformed_directive_is_config_error() {
        let config = LogConfig::new("info").with_directive("arbiter_cache=[");
        assert!(matches!(config.filter(), Err(TelemetryError::ConfigError(_))));
    }

    #[test]
    fn test_directory_target_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("var").join("log");
        let config = LogConfig::new("info")
            .in_directory(&logs)
            .with_file_config(FileLogConfig {
                prefix: "checks".to_owned(),
                rotation: FileRotation::Never,
                max_files: 3,
            });

        assert!(!config.ansi);
        assert!(config.layer().is_ok());
        assert!(logs.is_dir());
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_from_logging_section() {
        let section = arbiter_config::LoggingSection {
            level: "debug".to_owned(),
            format: "json".to_owned(),
            directives: vec!["arbiter_cache=trace".to_owned()],
        };
        let config = LogConfig::from_section(&section).unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.directives, section.directives);

        let bad = arbiter_config::LoggingSection {
            format: "xml".to_owned(),
            ..section
        };
        assert!(LogConfig::from_section(&bad).is_err());
    }
}
