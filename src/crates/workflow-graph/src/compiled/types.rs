//! Types returned by compiled graph methods

use crate::error::Result;
use crate::interrupt::Interrupt;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;
use workflow_checkpoint::{CheckpointConfig, CheckpointMetadata};

/// Result of one `invoke`
#[derive(Debug, Clone, PartialEq)]
pub enum InvokeOutcome {
    /// No more nodes scheduled; carries the final state values
    Completed(Value),
    /// One or more nodes paused and need resume values
    Interrupted(Vec<Interrupt>),
}

impl InvokeOutcome {
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted(_))
    }

    pub fn interrupts(&self) -> &[Interrupt] {
        match self {
            Self::Interrupted(interrupts) => interrupts,
            Self::Completed(_) => &[],
        }
    }
}

/// A task scheduled from a checkpoint, as reported by `get_state`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PregelTask {
    pub id: String,

    /// Node name
    pub name: String,

    /// Interrupts raised by this task that are still waiting for a resume value
    #[serde(default)]
    pub interrupts: Vec<Interrupt>,
}

/// Snapshot of a thread's state at one checkpoint
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    /// Workflow state values (runtime-internal channels excluded)
    pub values: Value,

    /// Names of nodes that still have to run. Empty once the workflow has finished.
    pub next: Vec<String>,

    /// Every task scheduled from this checkpoint, including finished ones
    pub tasks: Vec<PregelTask>,

    /// Config addressing this checkpoint
    pub config: CheckpointConfig,

    pub metadata: Option<CheckpointMetadata>,

    /// Creation time (RFC 3339)
    pub created_at: Option<String>,

    /// Config of the previous checkpoint in the thread
    pub parent_config: Option<CheckpointConfig>,
}

impl StateSnapshot {
    /// All interrupts still waiting for a resume value, in task order
    pub fn pending_interrupts(&self) -> impl Iterator<Item = &Interrupt> {
        self.tasks.iter().flat_map(|task| task.interrupts.iter())
    }

    pub fn is_interrupted(&self) -> bool {
        self.pending_interrupts().next().is_some()
    }
}

/// Stream of state snapshots for history traversal
pub type StateSnapshotStream = Pin<Box<dyn Stream<Item = Result<StateSnapshot>> + Send>>;
