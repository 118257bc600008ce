//! Structured logging using the tracing crate.
//!
//! Log output goes to stderr (or a log file); stdout carries the module
//! result only. Supported formats are pretty, compact and JSON. `RUST_LOG`
//! overrides the configured level.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    /// Convert from verbosity level (0-3+).
    pub fn from_verbosity(verbosity: u8) -> Self {
        match verbosity {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level '{}'", s)),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human output
    Pretty,
    /// Single-line output
    #[default]
    Compact,
    /// JSON structured output
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format '{}'. Valid values: pretty, compact, json", s)),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level when `RUST_LOG` is not set
    pub level: LogLevel,
    /// Output format
    pub format: LogFormat,
    /// Write logs to this file instead of stderr
    pub file: Option<PathBuf>,
    /// ANSI colors on stderr
    pub ansi_colors: bool,
    /// Include the event target
    pub with_target: bool,
    /// Include file and line
    pub with_file: bool,
    /// Extra filter directives, e.g. `azure_rm=debug,reqwest=warn`
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            format: LogFormat::Compact,
            file: None,
            ansi_colors: true,
            with_target: false,
            with_file: false,
            filter: None,
        }
    }
}

/// Builder for the global subscriber.
pub struct LoggingBuilder {
    config: LoggingConfig,
}

impl LoggingBuilder {
    /// Create a builder from an existing configuration.
    pub fn from_config(config: LoggingConfig) -> Self {
        Self { config }
    }

    /// Set the log level.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    /// Set the log format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    /// Set ANSI colors.
    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.config.ansi_colors = enabled;
        self
    }

    /// Set log file path.
    pub fn with_file_output(mut self, path: impl AsRef<Path>) -> Self {
        self.config.file = Some(path.as_ref().to_path_buf());
        self
    }

    fn build_filter(&self) -> EnvFilter {
        let default_filter = match &self.config.filter {
            Some(extra) => format!("{},{}", self.config.level, extra),
            None => self.config.level.to_string(),
        };
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&default_filter))
            .unwrap_or_else(|_| EnvFilter::new(self.config.level.to_string()))
    }

    fn build_writer(&self) -> Result<(BoxMakeWriter, bool)> {
        match &self.config.file {
            Some(path) => {
                let file = open_log_file(path)?;
                Ok((BoxMakeWriter::new(Mutex::new(file)), false))
            }
            None => Ok((BoxMakeWriter::new(std::io::stderr), self.config.ansi_colors)),
        }
    }

    /// Build and initialize the global subscriber.
    pub fn init(self) -> Result<()> {
        let env_filter = self.build_filter();
        let (writer, ansi) = self.build_writer()?;
        let registry = tracing_subscriber::registry().with(env_filter);

        let result = match self.config.format {
            LogFormat::Pretty => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(writer)
                        .with_ansi(ansi)
                        .with_target(self.config.with_target)
                        .with_file(self.config.with_file)
                        .with_line_number(self.config.with_file),
                )
                .try_init(),
            LogFormat::Compact => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_writer(writer)
                        .with_ansi(ansi)
                        .with_target(self.config.with_target)
                        .with_file(self.config.with_file)
                        .with_line_number(self.config.with_file),
                )
                .try_init(),
            LogFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(writer)
                        .with_target(self.config.with_target)
                        .with_file(self.config.with_file)
                        .with_line_number(self.config.with_file),
                )
                .try_init(),
        };

        result.map_err(|e| Error::InvalidConfig(format!("failed to initialize logging: {}", e)))
    }
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: format!("cannot open log file: {}", e),
        })
}

/// Initialize logging from configuration, raised by `-v` flags.
pub fn init(config: &LoggingConfig, verbosity: u8) -> Result<()> {
    let mut config = config.clone();
    if verbosity > 0 {
        config.level = LogLevel::from_verbosity(verbosity);
        config.with_target = verbosity >= 2;
        config.with_file = verbosity >= 3;
    }
    LoggingBuilder::from_config(config).init()
}
