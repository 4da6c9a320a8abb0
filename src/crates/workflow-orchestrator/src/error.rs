//! Error types for the orchestrator

use thiserror::Error;
use workflow_graph::GraphError;
use workflow_state::StateError;

/// Result type for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Errors that can occur while driving a workflow step
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The workflow paused with nodes still scheduled but raised no interrupt describing the
    /// next tool call
    #[error("Workflow for thread '{thread_id}' paused without an interrupt payload")]
    MissingInterruptPayload { thread_id: String },

    /// The interrupt value is not a next-tool-call description
    #[error("Invalid interrupt payload for thread '{thread_id}': {source}")]
    InvalidInterruptPayload {
        thread_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// Graph runtime error (node failures, checkpointer failures)
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// State persistence error
    #[error(transparent)]
    State(#[from] StateError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
