//! Logging setup
//!
//! Everything goes through `tracing`. Simulator crates log at the requested
//! level; the HTTP and MQTT client stacks are capped at `warn` so a debug run
//! shows ticks rather than connection chatter. `RUST_LOG` overrides both.

use std::fmt;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Transport crates kept quiet by [`default_filter`]
const QUIET_TARGETS: &[&str] = &["rumqttc", "reqwest", "hyper", "hyper_util", "rustls"];

/// Verbosity selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Per-tick readings
    Trace,
    /// Per-tick positions
    Debug,
    /// Lifecycle only
    #[default]
    Info,
    /// Dropped samples and sink failures
    Warn,
    /// Fatal problems only
    Error,
}

impl LogLevel {
    /// All levels, most verbose first
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
    ];

    /// Lowercase name as accepted by `EnvFilter`
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
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

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        if wanted == "warning" {
            return Ok(LogLevel::Warn);
        }
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == wanted)
            .ok_or_else(|| format!("unknown log level: {s}"))
    }
}

/// Filter directives used when `RUST_LOG` is unset.
///
/// Quiet targets never log more than `warn`, and never more than the
/// global level either.
pub fn default_filter(level: LogLevel) -> String {
    let global = Level::from(level);
    let quiet = global.min(Level::WARN).as_str().to_ascii_lowercase();
    let mut directives = vec![level.as_str().to_string()];
    directives.extend(QUIET_TARGETS.iter().map(|target| format!("{target}={quiet}")));
    directives.join(",")
}

/// Installs the global subscriber for `level`.
///
/// Output goes to stderr so it does not interleave with the console sink on
/// stdout. Calling it twice is harmless.
///
/// ```no_run
/// use mottag_common::logging::{init_logging, LogLevel};
///
/// init_logging(LogLevel::Debug);
/// ```
pub fn init_logging(level: LogLevel) {
    init_logging_with_filter(&default_filter(level));
}

/// Installs the global subscriber with explicit filter directives.
///
/// ```no_run
/// use mottag_common::logging::init_logging_with_filter;
///
/// init_logging_with_filter("info,mottag_sim=trace");
/// ```
pub fn init_logging_with_filter(directives: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
