//! Error types for graph construction and execution
//!
//! ```text
//! GraphError
//! ├── Validation       - Graph structure errors (compile time)
//! ├── NodeExecution    - A node returned an error
//! ├── InvalidUpdate    - A node returned something other than an object
//! ├── Interrupt        - A node paused for external input (internal signal)
//! ├── NotInterrupted   - Resume requested on a thread with nothing to resume
//! ├── RecursionLimit   - Too many supersteps in one invocation
//! ├── Checkpoint       - Persistence errors
//! └── Serialization    - JSON errors
//! ```
//!
//! `Interrupt` is how [`NodeContext::interrupt`](crate::NodeContext::interrupt) unwinds a node.
//! The runtime catches it, records it against the thread's current checkpoint and reports
//! [`InvokeOutcome::Interrupted`](crate::InvokeOutcome::Interrupted); callers of `invoke` never
//! see it as an error.

use crate::interrupt::Interrupt;
use thiserror::Error;
use workflow_checkpoint::CheckpointError;

/// Convenience result type using [`GraphError`]
pub type Result<T> = std::result::Result<T, GraphError>;

/// Error type for all graph operations
#[derive(Error, Debug)]
pub enum GraphError {
    /// Graph structure validation failed
    ///
    /// **Common causes**:
    /// - Edge source or target doesn't exist
    /// - No entry point
    /// - Node name collides with a reserved name
    #[error("Graph validation failed: {0}")]
    Validation(String),

    /// Node execution failed with context
    #[error("Node '{node}' execution failed: {error}")]
    NodeExecution {
        /// Name of the node that failed
        node: String,
        /// Error message from node execution
        error: String,
    },

    /// A node returned an update that cannot be merged into state
    #[error("Node '{node}' returned an invalid update: expected an object or null, got {found}")]
    InvalidUpdate { node: String, found: String },

    /// A node requested external input
    #[error("Graph execution interrupted: {}", .0.value)]
    Interrupt(Interrupt),

    /// `Command::Resume` on a thread without a pending interrupt
    #[error("Thread '{0}' has no pending interrupt to resume")]
    NotInterrupted(String),

    /// The superstep loop ran too long without finishing or pausing
    #[error("Recursion limit of {0} supersteps reached without hitting a stop condition")]
    RecursionLimit(usize),

    /// Checkpoint persistence failed
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GraphError {
    /// Create a node execution error
    pub fn node_execution(node: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::NodeExecution {
            node: node.into(),
            error: error.to_string(),
        }
    }

    /// Whether this error is the internal interrupt signal
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Self::Interrupt(_))
    }
}
