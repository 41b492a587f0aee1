//! Error types for deckhand

use thiserror::Error;

/// Main error type for deckhand
#[derive(Error, Debug)]
pub enum DeckhandError {
    /// Missing or invalid request fields
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Unknown repository, host, script or playbook
    #[error("Not found: {0}")]
    NotFound(String),

    /// Script exited non-zero or could not be spawned
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// Event store could not be read or written
    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for DeckhandError {
    fn from(err: anyhow::Error) -> Self {
        DeckhandError::Internal(err.to_string())
    }
}
