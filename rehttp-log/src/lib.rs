//! rehttp logging setup
//!
//! Installs a `tracing` subscriber configured from `REHTTP_*` environment
//! variables. The transport emits its per-attempt events through `tracing`;
//! this crate decides where they go and how they look.
//!
//! # Usage
//!
//! ```rust,no_run
//! rehttp_log::init();
//! tracing::info!("client ready");
//! ```
//!
//! # Environment Variables
//!
//! - `REHTTP_DEBUG=1` - Enable debug logging
//! - `REHTTP_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `REHTTP_LOG_FORMAT=pretty|json|compact` - Set output format
//! - `REHTTP_LOG_COLOR=1|0` - Enable/disable colors
//! - `REHTTP_LOG_TIMESTAMPS=1|0` - Include timestamps
//! - `REHTTP_LOG_MODULE=1|0` - Include the event target
//! - `RUST_LOG` - Full filter directives; overrides the level when set

use once_cell::sync::Lazy;
use std::env;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Registry};

// ============================================================================
// Log Levels
// ============================================================================

/// Minimum level of events to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Trace level (most verbose)
    Trace,
    /// Debug level
    Debug,
    /// Info level
    Info,
    /// Warning level
    Warn,
    /// Error level (least verbose)
    Error,
    /// Off (no logging)
    Off,
}

impl Level {
    /// Parse a level name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// The `EnvFilter` directive for this level.
    pub fn as_directive(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_directive())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-line human readable output
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for structured logging
    Json,
}

impl Format {
    /// Parse a format name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

static CONFIG: Lazy<LogConfig> = Lazy::new(LogConfig::from_env);

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether debug mode is enabled
    pub debug: bool,
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether colors are enabled
    pub color: bool,
    /// Whether to include timestamps
    pub timestamps: bool,
    /// Whether to include the event target
    pub module_path: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Compact,
            color: false,
            timestamps: true,
            module_path: true,
        }
    }
}

fn flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

impl LogConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let debug = lookup("REHTTP_DEBUG").is_some_and(|v| flag(&v));

        let level = lookup("REHTTP_LOG_LEVEL")
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = lookup("REHTTP_LOG_FORMAT")
            .and_then(|s| Format::parse(&s))
            .unwrap_or(Format::Compact);

        let color = lookup("REHTTP_LOG_COLOR")
            .map(|v| flag(&v))
            .unwrap_or_else(|| lookup("NO_COLOR").is_none() && lookup("TERM").is_some());

        let timestamps = lookup("REHTTP_LOG_TIMESTAMPS").is_none_or(|v| flag(&v));
        let module_path = lookup("REHTTP_LOG_MODULE").is_none_or(|v| flag(&v));

        Self {
            debug,
            level,
            format,
            color,
            timestamps,
            module_path,
        }
    }

    /// Lower the level to at least `debug`.
    pub fn verbose(mut self) -> Self {
        self.debug = true;
        if self.level > Level::Debug {
            self.level = Level::Debug;
        }
        self
    }

    /// Build the filter, preferring `RUST_LOG` when it is set.
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.as_directive()))
    }
}

/// Get the configuration read from the environment at first use.
pub fn config() -> &'static LogConfig {
    &CONFIG
}

// ============================================================================
// Subscriber
// ============================================================================

type BoxedLayer = Box<dyn Layer<tracing_subscriber::layer::Layered<EnvFilter, Registry>> + Send + Sync>;

fn fmt_layer(config: &LogConfig) -> BoxedLayer {
    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.color)
        .with_target(config.module_path);

    match (config.format, config.timestamps) {
        (Format::Pretty, true) => base.pretty().boxed(),
        (Format::Pretty, false) => base.pretty().without_time().boxed(),
        #[cfg(feature = "json")]
        (Format::Json, true) => base.json().boxed(),
        #[cfg(feature = "json")]
        (Format::Json, false) => base.json().without_time().boxed(),
        (_, true) => base.compact().boxed(),
        (_, false) => base.compact().without_time().boxed(),
    }
}

/// Create a subscriber for the given configuration.
pub fn subscriber(config: &LogConfig) -> impl tracing::Subscriber + Send + Sync + use<> {
    tracing_subscriber::registry()
        .with(config.filter())
        .with(fmt_layer(config))
}

/// Install the global subscriber configured from the environment.
///
/// Does nothing if a subscriber is already installed.
pub fn init() {
    let _ = try_init();
}

/// Install the global subscriber configured from the environment.
pub fn try_init() -> Result<(), TryInitError> {
    try_init_with(config())
}

/// Install the global subscriber for an explicit configuration.
pub fn try_init_with(config: &LogConfig) -> Result<(), TryInitError> {
    subscriber(config).try_init()
}

// ============================================================================
// Tests
// ============================================================================
