//! Error types shared across planvox crates

use thiserror::Error;

/// Common error type for shared functionality
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or persistence errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Document parsing or structure errors
    #[error("Document error: {0}")]
    Document(String),

    /// JSON serialization errors
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using the common Error
pub type Result<T> = std::result::Result<T, Error>;
