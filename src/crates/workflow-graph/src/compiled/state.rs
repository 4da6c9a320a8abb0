//! State inspection methods (get_state, get_state_history)

use super::{CompiledGraph, PregelTask, StateSnapshot, StateSnapshotStream};
use crate::error::{GraphError, Result};
use crate::graph::StateGraph;
use crate::pregel::algo;
use futures::StreamExt;
use workflow_checkpoint::{CheckpointConfig, CheckpointTuple};

impl CompiledGraph {
    /// Retrieve the state of a thread at its latest checkpoint (or the exact checkpoint the
    /// config names).
    ///
    /// Returns `None` for a thread without any checkpoint.
    pub async fn get_state(&self, config: &CheckpointConfig) -> Result<Option<StateSnapshot>> {
        let tuple = self.checkpointer.get_tuple(config).await?;
        Ok(tuple.map(|t| checkpoint_tuple_to_snapshot(&self.graph, t)))
    }

    /// Snapshots of a thread, most recent first
    pub async fn get_state_history(
        &self,
        config: &CheckpointConfig,
        limit: Option<usize>,
    ) -> Result<StateSnapshotStream> {
        let graph = self.graph.clone();
        let checkpoint_stream = self.checkpointer.list(Some(config), None, None, limit).await?;

        let snapshot_stream = checkpoint_stream.map(move |result| {
            result
                .map(|tuple| checkpoint_tuple_to_snapshot(&graph, tuple))
                .map_err(GraphError::Checkpoint)
        });

        Ok(Box::pin(snapshot_stream))
    }
}

fn checkpoint_tuple_to_snapshot(graph: &StateGraph, tuple: CheckpointTuple) -> StateSnapshot {
    let mut next = Vec::new();
    let tasks: Vec<PregelTask> = algo::prepare_next_tasks(&tuple.checkpoint, graph)
        .into_iter()
        .map(|task| {
            let progress = algo::task_progress(&tuple.pending_writes, &task.id);
            if !progress.completed {
                next.push(task.name.clone());
            }
            PregelTask {
                id: task.id,
                name: task.name,
                interrupts: progress.pending_interrupt().cloned().into_iter().collect(),
            }
        })
        .collect();

    StateSnapshot {
        values: algo::state_view(&tuple.checkpoint),
        next,
        tasks,
        created_at: Some(tuple.checkpoint.ts.to_rfc3339()),
        config: tuple.config,
        metadata: Some(tuple.metadata),
        parent_config: tuple.parent_config,
    }
}
