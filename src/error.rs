//! Error types for the link and its configuration

use thiserror::Error;

/// Transport-level failures. None of these are fatal: the connection manager
/// turns them into a log entry, a state flip and (after the close) a retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Handshake with the controller never completed.
    #[error("failed to open connection: {0}")]
    Open(String),

    /// The established connection broke mid-session.
    #[error("connection error: {0}")]
    Stream(String),

    /// An outbound frame could not be handed to the connection task.
    #[error("failed to send frame: {0}")]
    Send(String),
}

/// Input that names none of the five directions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown direction {0:?}")]
pub struct UnknownDirection(pub String);

/// Failures while loading [`Settings`](crate::config::Settings).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },
}
