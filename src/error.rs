//! Error types for the assistant core.

use thiserror::Error;

/// Result type alias for assistant operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable configuration
    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The platform has no speech capability of the requested kind
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),

    /// Another recognition session already holds the microphone
    #[error("recognizer busy: session {0} is still active")]
    RecognizerBusy(u64),

    #[error("{0}")]
    InvalidTransition(String),

    /// A deferred action failed to run
    #[error("action failed: {0}")]
    Action(String),

    /// An internal task went away
    #[error("{0} channel closed")]
    ChannelClosed(&'static str),
}
