//! Compiled graph: a validated [`StateGraph`] bound to a checkpointer
//!
//! - [`execution`] - `invoke` and the superstep loop
//! - [`state`] - `get_state` / `get_state_history`
//! - [`types`] - `InvokeOutcome`, `StateSnapshot`, `PregelTask`

mod execution;
mod state;
pub mod types;

pub use types::{InvokeOutcome, PregelTask, StateSnapshot, StateSnapshotStream};

use crate::graph::StateGraph;
use std::sync::Arc;
use workflow_checkpoint::CheckpointSaver;

/// Default maximum number of supersteps per invocation
pub const DEFAULT_RECURSION_LIMIT: usize = 25;

/// Executable graph
///
/// Cheap to clone; clones share the graph definition and the checkpointer.
#[derive(Clone)]
pub struct CompiledGraph {
    pub(crate) graph: Arc<StateGraph>,
    pub(crate) checkpointer: Arc<dyn CheckpointSaver>,
    pub(crate) recursion_limit: usize,
}

impl CompiledGraph {
    pub(crate) fn new(graph: StateGraph, checkpointer: Arc<dyn CheckpointSaver>) -> Self {
        Self {
            graph: Arc::new(graph),
            checkpointer,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    /// Set the maximum number of supersteps a single `invoke` may run
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    pub fn checkpointer(&self) -> &Arc<dyn CheckpointSaver> {
        &self.checkpointer
    }

    /// Node names in scheduling order
    pub fn node_names(&self) -> Vec<&str> {
        self.graph.nodes.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for CompiledGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("graph", &self.graph)
            .field("recursion_limit", &self.recursion_limit)
            .finish()
    }
}
