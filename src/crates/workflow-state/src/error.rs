//! Error types for workflow state persistence and management

use std::path::PathBuf;
use thiserror::Error;
use workflow_checkpoint::CheckpointError;

/// Result type for state operations
pub type Result<T> = std::result::Result<T, StateError>;

/// Errors that can occur while persisting or loading workflow state
#[derive(Error, Debug)]
pub enum StateError {
    /// Content handed to `write_state` is not valid JSON
    #[error("Refusing to write invalid state JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// Filesystem error, with the path that was being touched
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// SQLite error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Checkpoint store error (e.g. persisted state that cannot be imported)
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

impl StateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
