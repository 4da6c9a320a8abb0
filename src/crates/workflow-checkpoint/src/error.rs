//! Error types for checkpoint operations

use thiserror::Error;

/// Result type for checkpoint operations
pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Errors that can occur during checkpoint operations
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// Checkpoint not found
    #[error("Checkpoint not found: {0}")]
    NotFound(String),

    /// Serialization error (including malformed exported state)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid checkpoint or config
    #[error("Invalid checkpoint: {0}")]
    Invalid(String),
}
