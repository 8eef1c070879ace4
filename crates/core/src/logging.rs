//! Logging setup for embedctl binaries and tests
//!
//! Library code only emits `tracing` events; installing a subscriber is up
//! to the binary.

use crate::error::{EmbedError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level for all embedctl crates
    #[serde(default = "default_level")]
    pub level: LogLevel,
    /// Per-target overrides, e.g. `embedctl_client::transport = "trace"`
    #[serde(default)]
    pub module_levels: BTreeMap<String, LogLevel>,
    #[serde(default = "default_format")]
    pub format: LogFormat,
    #[serde(default = "default_output")]
    pub output: LogOutput,
    /// Include source location (file:line) in logs
    #[serde(default)]
    pub include_location: bool,
    #[serde(default)]
    pub include_thread_info: bool,
    #[serde(default = "default_colors")]
    pub enable_colors: bool,
}

fn default_level() -> LogLevel {
    LogLevel::Info
}
fn default_format() -> LogFormat {
    LogFormat::Compact
}
fn default_output() -> LogOutput {
    LogOutput::Stderr
}
fn default_colors() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            module_levels: BTreeMap::new(),
            format: default_format(),
            output: default_output(),
            include_location: false,
            include_thread_info: false,
            enable_colors: default_colors(),
        }
    }
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
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

impl std::str::FromStr for LogLevel {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(EmbedError::config(format!("Invalid log level: {s}"))),
        }
    }
}

/// Log output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact single-line format
    Compact,
    /// Pretty multi-line format for development
    Pretty,
    /// Full format with all available information
    Full,
    /// One JSON object per event
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "full" => Ok(LogFormat::Full),
            "json" => Ok(LogFormat::Json),
            _ => Err(EmbedError::config(format!("Invalid log format: {s}"))),
        }
    }
}

/// Where log lines go; stderr keeps stdout free for command output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    Stderr,
}

/// Logger builder for configuring the logging system
#[derive(Debug, Clone, Default)]
pub struct LoggerBuilder {
    config: LoggingConfig,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: LoggingConfig) -> Self {
        Self { config }
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn module_level<S: Into<String>>(mut self, module: S, level: LogLevel) -> Self {
        self.config.module_levels.insert(module.into(), level);
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.config.output = output;
        self
    }

    pub fn location(mut self, enable: bool) -> Self {
        self.config.include_location = enable;
        self
    }

    pub fn thread_info(mut self, enable: bool) -> Self {
        self.config.include_thread_info = enable;
        self
    }

    pub fn colors(mut self, enable: bool) -> Self {
        self.config.enable_colors = enable;
        self
    }

    /// Filter the configuration would install, ignoring `RUST_LOG`
    pub fn filter(&self) -> Result<EnvFilter> {
        build_filter(&self.config)
    }

    /// Install the global subscriber
    pub fn init(self) -> Result<()> {
        init_logging(self.config)
    }
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let mut filter = EnvFilter::new("warn");
    let directives = std::iter::once(format!("embedctl={}", config.level)).chain(
        config
            .module_levels
            .iter()
            .map(|(module, level)| format!("{module}={level}")),
    );
    for directive in directives {
        let parsed = directive
            .parse()
            .map_err(|e| EmbedError::config(format!("Invalid log directive '{directive}': {e}")))?;
        filter = filter.add_directive(parsed);
    }
    Ok(filter)
}

/// Initialize the logging system with the given configuration
///
/// `RUST_LOG`, when set, replaces the configured filter.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(env_filter) if !env_filter.trim().is_empty() => EnvFilter::new(env_filter),
        _ => build_filter(&config)?,
    };

    let writer = match config.output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
    };

    let registry = Registry::default().with(filter);
    let fmt_layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(config.include_thread_info)
        .with_thread_names(config.include_thread_info)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    let installed = match config.format {
        LogFormat::Json => registry.with(fmt_layer.json()).try_init(),
        LogFormat::Compact => registry
            .with(fmt_layer.with_ansi(config.enable_colors).compact())
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt_layer.with_ansi(config.enable_colors).pretty())
            .try_init(),
        LogFormat::Full => registry
            .with(fmt_layer.with_ansi(config.enable_colors))
            .try_init(),
    };
    installed.map_err(|e| EmbedError::internal(format!("Logger already installed: {e}")))?;

    tracing::debug!("Logging initialized: {:?}", config);
    Ok(())
}

/// Initialize logging from `EMBEDCTL_LOG_LEVEL` and `EMBEDCTL_LOG_FORMAT`
pub fn init_from_env() -> Result<()> {
    LoggerBuilder::from_config(config_from_env(LoggingConfig::default())?).init()
}

/// Apply the logging environment variables on top of `config`
pub fn config_from_env(mut config: LoggingConfig) -> Result<LoggingConfig> {
    if let Ok(level) = std::env::var("EMBEDCTL_LOG_LEVEL") {
        config.level = level.parse()?;
    }
    if let Ok(format) = std::env::var("EMBEDCTL_LOG_FORMAT") {
        config.format = format.parse()?;
    }
    if std::env::var("NO_COLOR").is_ok() {
        config.enable_colors = false;
    }
    Ok(config)
}
