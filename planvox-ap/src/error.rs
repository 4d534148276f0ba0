//! Error types for planvox-ap
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. The transport controller is the single point that translates
//! these into the `Error` playback status; cache errors are logged and never
//! surfaced to playback state.

use thiserror::Error;

/// Main error type for the planvox-ap module
#[derive(Error, Debug)]
pub enum Error {
    /// Empty or blank text submitted for synthesis (caught before any I/O)
    #[error("Validation error: {0}")]
    InvalidText(String),

    /// Speech synthesis service failure
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// Plan generation service failure
    #[error("Plan generation error: {0}")]
    Plan(String),

    /// Summary service failure
    #[error("Summary error: {0}")]
    Summary(String),

    /// Raw audio bytes could not be decoded into a playable buffer
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Server signaled quota exhaustion; includes the reset time
    #[error("Rate limited: {message} (resets at {reset_at})")]
    RateLimited {
        message: String,
        reset_at: chrono::DateTime<chrono::Utc>,
    },

    /// Audio cache failures (logged by callers, never fatal to playback)
    #[error("Cache error: {0}")]
    Cache(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP transport errors talking to external services
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation not valid in the current playback status
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using the planvox-ap Error
pub type Result<T> = std::result::Result<T, Error>;
