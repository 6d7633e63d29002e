//! Error type for hub setup and serving

use thiserror::Error;

/// Errors raised while configuring or running the hub
///
/// Broadcast and session failures never show up here: they are handled
/// locally (dropped frame or removed connection) and only logged.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("invalid value {value:?} for {key}")]
    Config { key: String, value: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for hub operations
pub type HubResult<T> = Result<T, HubError>;
