//! Error types for mottag

use thiserror::Error;

/// Error types for the mottag crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or incomplete configuration. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The center4 estimator was given fewer antenna/reading pairs than it needs.
    #[error("Insufficient antennas: center4 requires at least {required}, got {got}")]
    InsufficientAntennas {
        /// Number of pairs the estimator needs
        required: usize,
        /// Number of pairs supplied
        got: usize,
    },

    /// Failure inside a telemetry or visualization sink.
    #[error("Sink transport error: {0}")]
    SinkTransport(String),

    /// File or network I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON encoding errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true for errors that must stop the process at startup.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::SinkTransport(_))
    }
}
