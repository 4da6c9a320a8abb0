//! Superstep scheduling
//!
//! Execution proceeds in supersteps. Each superstep runs every node whose trigger channel
//! (`branch:to:<node>`) has a newer version than the node last saw, then folds all of their
//! writes into the next checkpoint at once.
//!
//! ```text
//! checkpoint N ──prepare_next_tasks──► [tasks] ──run──► writes ──apply_writes──► checkpoint N+1
//!                                         │
//!                                         └─ interrupt ──► pending write on checkpoint N, stop
//! ```

pub(crate) mod algo;

use serde_json::Value;

use crate::interrupt::Interrupt;

/// A node scheduled to run from a given checkpoint
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PreparedTask {
    /// Deterministic id derived from the checkpoint id and node name
    pub id: String,
    pub name: String,
    /// Trigger channel and the version that scheduled the task
    pub trigger: String,
    pub trigger_version: u64,
}

/// What the checkpoint's pending writes say about one task
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct TaskProgress {
    /// The task ran to completion; `writes` holds its output
    pub completed: bool,
    pub writes: Vec<(String, Value)>,
    /// Most recent interrupt raised by the task
    pub interrupt: Option<Interrupt>,
    /// Resume values supplied so far, by interrupt position
    pub resume: Vec<Value>,
}

impl TaskProgress {
    /// The interrupt still waiting for a resume value, if any
    pub fn pending_interrupt(&self) -> Option<&Interrupt> {
        if self.completed {
            return None;
        }
        self.interrupt
            .as_ref()
            .filter(|interrupt| interrupt.index >= self.resume.len())
    }
}
