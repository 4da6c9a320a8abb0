//! Graph execution: `invoke` and the superstep loop

use super::{CompiledGraph, InvokeOutcome};
use crate::command::{Command, GraphInput};
use crate::error::{GraphError, Result};
use crate::graph::START;
use crate::interrupt::{Interrupt, NodeContext, INTERRUPT, NO_WRITES, RESUME};
use crate::pregel::algo::{self, trigger_channel};
use crate::pregel::PreparedTask;
use futures::future::join_all;
use serde_json::{Map, Value};
use tracing::{debug, error, info};
use workflow_checkpoint::{
    CheckpointConfig, CheckpointError, CheckpointMetadata, CheckpointSource, CheckpointTuple,
};

/// How one task of a superstep ended
enum TaskOutcome {
    Finished(Vec<(String, Value)>),
    Interrupted(Interrupt),
    Failed(GraphError),
}

fn require_thread_id(config: &CheckpointConfig) -> Result<String> {
    config
        .thread_id
        .clone()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| CheckpointError::Invalid("thread_id is required".to_string()).into())
}

/// Interpret a node's (or the input's) return value as a state update
fn as_update(node: &str, value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(GraphError::InvalidUpdate {
            node: node.to_string(),
            found: type_name(&other).to_string(),
        }),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl CompiledGraph {
    /// Run the thread addressed by `config` until it finishes or pauses.
    ///
    /// Execution always continues from the thread's latest checkpoint.
    ///
    /// - [`GraphInput::Start`] merges the input object into state and schedules the entry
    ///   nodes. On a thread that already has history the previous state is kept.
    /// - [`Command::Resume`] answers the first pending interrupt and re-runs the interrupted
    ///   node; nodes that already finished in that superstep are not run again.
    ///
    /// # Errors
    ///
    /// - [`GraphError::NotInterrupted`] when resuming a thread with no pending interrupt
    /// - [`GraphError::RecursionLimit`] after too many supersteps
    /// - Node failures and checkpointer failures propagate unchanged
    pub async fn invoke(&self, input: impl Into<GraphInput>, config: &CheckpointConfig) -> Result<InvokeOutcome> {
        let thread_id = require_thread_id(config)?;
        let latest = self.checkpointer.get_tuple(&config.latest()).await?;

        let tuple = match input.into() {
            GraphInput::Start(value) => self.start(config, latest, value).await?,
            GraphInput::Command(Command::Resume(value)) => self.resume(&thread_id, latest, value).await?,
        };

        self.run(tuple).await
    }

    /// Write the input checkpoint for a new run
    async fn start(
        &self,
        config: &CheckpointConfig,
        latest: Option<CheckpointTuple>,
        input: Value,
    ) -> Result<CheckpointTuple> {
        let update = as_update(START, input)?;

        let (previous, step, parent_config) = match latest {
            Some(tuple) => {
                let step = tuple.metadata.step.unwrap_or(-1) + 1;
                (Some(tuple.checkpoint), step, tuple.config)
            }
            None => (None, -1, config.latest()),
        };

        let state = previous.as_ref().map(algo::state_view).unwrap_or_else(|| Value::Object(Map::new()));
        let targets = self.graph.route(START, &algo::merged(&state, &update))?;

        let mut writes: Vec<(String, Value)> = update.clone().into_iter().collect();
        writes.extend(targets.iter().map(|node| (trigger_channel(node), Value::Null)));

        let (checkpoint, new_versions) = algo::apply_writes(previous.as_ref(), &[], &writes);
        let mut input_writes = Map::new();
        input_writes.insert(START.to_string(), Value::Object(update));
        let metadata = CheckpointMetadata::new()
            .with_source(CheckpointSource::Input)
            .with_step(step)
            .with_extra("writes", Value::Object(input_writes));

        let saved = self
            .checkpointer
            .put(&parent_config, checkpoint.clone(), metadata.clone(), new_versions)
            .await?;

        debug!(checkpoint_id = ?saved.checkpoint_id, step, entry = ?targets, "Started run");

        let tuple = CheckpointTuple::new(saved, checkpoint, metadata);
        Ok(if parent_config.checkpoint_id.is_some() {
            tuple.with_parent_config(parent_config)
        } else {
            tuple
        })
    }

    /// Record the resume value against the first pending interrupt
    async fn resume(
        &self,
        thread_id: &str,
        latest: Option<CheckpointTuple>,
        value: Value,
    ) -> Result<CheckpointTuple> {
        let tuple = latest.ok_or_else(|| GraphError::NotInterrupted(thread_id.to_string()))?;

        let pending = algo::prepare_next_tasks(&tuple.checkpoint, &self.graph)
            .into_iter()
            .find_map(|task| {
                let progress = algo::task_progress(&tuple.pending_writes, &task.id);
                let index = progress.pending_interrupt()?.index;
                Some((task, progress.resume, index))
            });

        let Some((task, mut resume, index)) = pending else {
            return Err(GraphError::NotInterrupted(thread_id.to_string()));
        };

        resume.truncate(index);
        resume.push(value);
        self.checkpointer
            .put_writes(&tuple.config, vec![(RESUME.to_string(), Value::Array(resume))], task.id.clone())
            .await?;

        info!(thread_id, node = %task.name, interrupt_index = index, "Resuming interrupted task");

        self.checkpointer
            .get_tuple(&tuple.config)
            .await?
            .ok_or_else(|| GraphError::Checkpoint(CheckpointError::NotFound(format!("{:?}", tuple.config))))
    }

    /// Superstep loop starting from `tuple`
    async fn run(&self, mut tuple: CheckpointTuple) -> Result<InvokeOutcome> {
        let mut supersteps = 0;

        loop {
            let tasks = algo::prepare_next_tasks(&tuple.checkpoint, &self.graph);
            if tasks.is_empty() {
                debug!(checkpoint_id = %tuple.checkpoint.id, "No tasks scheduled, run complete");
                return Ok(InvokeOutcome::Completed(algo::state_view(&tuple.checkpoint)));
            }

            if supersteps >= self.recursion_limit {
                error!(limit = self.recursion_limit, "Recursion limit reached");
                return Err(GraphError::RecursionLimit(self.recursion_limit));
            }
            supersteps += 1;

            let step = tuple.metadata.step.unwrap_or(-1);
            let outcomes = self.run_tasks(&tuple, &tasks, step).await;

            let mut finished = Vec::new();
            let mut interrupts = Vec::new();
            let mut failure = None;

            for (task, outcome) in tasks.into_iter().zip(outcomes) {
                match outcome {
                    TaskOutcome::Finished(writes) => {
                        let recorded = if writes.is_empty() {
                            vec![(NO_WRITES.to_string(), Value::Null)]
                        } else {
                            writes.clone()
                        };
                        self.checkpointer
                            .put_writes(&tuple.config, recorded, task.id.clone())
                            .await?;
                        finished.push((task, writes));
                    }
                    TaskOutcome::Interrupted(interrupt) => {
                        self.checkpointer
                            .put_writes(
                                &tuple.config,
                                vec![(INTERRUPT.to_string(), serde_json::to_value(&interrupt)?)],
                                task.id.clone(),
                            )
                            .await?;
                        info!(node = %task.name, interrupt_id = %interrupt.id, "Node interrupted");
                        interrupts.push(interrupt);
                    }
                    TaskOutcome::Failed(e) => {
                        error!(node = %task.name, error = %e, "Node failed");
                        failure.get_or_insert(e);
                    }
                }
            }

            if let Some(e) = failure {
                return Err(e);
            }
            if !interrupts.is_empty() {
                return Ok(InvokeOutcome::Interrupted(interrupts));
            }

            let (checkpoint, new_versions) = algo::apply_writes(Some(&tuple.checkpoint), &finished, &[]);
            let node_writes: Map<String, Value> = finished
                .iter()
                .map(|(task, writes)| {
                    let state_writes: Map<String, Value> = writes
                        .iter()
                        .filter(|(channel, _)| !algo::is_internal_channel(channel))
                        .cloned()
                        .collect();
                    (task.name.clone(), Value::Object(state_writes))
                })
                .collect();
            let metadata = CheckpointMetadata::new()
                .with_source(CheckpointSource::Loop)
                .with_step(step + 1)
                .with_extra("writes", Value::Object(node_writes));

            let saved = self
                .checkpointer
                .put(&tuple.config, checkpoint.clone(), metadata.clone(), new_versions)
                .await?;
            debug!(checkpoint_id = ?saved.checkpoint_id, step = step + 1, "Superstep complete");

            tuple = CheckpointTuple::new(saved, checkpoint, metadata).with_parent_config(tuple.config);
        }
    }

    /// Run the superstep's tasks concurrently; tasks that already finished reuse their writes
    async fn run_tasks(&self, tuple: &CheckpointTuple, tasks: &[PreparedTask], step: i64) -> Vec<TaskOutcome> {
        let state = algo::state_view(&tuple.checkpoint);

        let runs = tasks.iter().map(|task| {
            let progress = algo::task_progress(&tuple.pending_writes, &task.id);
            let state = state.clone();
            let graph = self.graph.clone();
            let task = task.clone();

            async move {
                if progress.completed {
                    debug!(node = %task.name, "Reusing writes of finished task");
                    return TaskOutcome::Finished(progress.writes);
                }

                let Some(executor) = graph.nodes.get(&task.name).cloned() else {
                    return TaskOutcome::Failed(GraphError::node_execution(&task.name, "node not found"));
                };

                let ctx = NodeContext::new(task.name.clone(), task.id.clone(), step, progress.resume);
                let result = executor(state.clone(), ctx).await.and_then(|value| as_update(&task.name, value));

                match result {
                    Ok(update) => {
                        let targets = match graph.route(&task.name, &algo::merged(&state, &update)) {
                            Ok(targets) => targets,
                            Err(e) => return TaskOutcome::Failed(e),
                        };
                        let mut writes: Vec<(String, Value)> = update.into_iter().collect();
                        writes.extend(targets.iter().map(|node| (trigger_channel(node), Value::Null)));
                        TaskOutcome::Finished(writes)
                    }
                    Err(GraphError::Interrupt(interrupt)) => TaskOutcome::Interrupted(interrupt),
                    Err(e) => TaskOutcome::Failed(e),
                }
            }
        });

        join_all(runs).await
    }
}
