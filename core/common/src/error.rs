//! Common error types for gdshare.

use thiserror::Error;

/// Top-level error type for gdshare operations.
#[derive(Debug, Error)]
pub enum Error {
    /// OAuth2 authorization or token handling failed.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Request to the storage service failed.
    #[error("Network error: {0}")]
    Network(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The service refused the request.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration file is missing a value or holds a bad one.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
