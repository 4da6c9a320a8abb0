//! Core scheduling functions: task preparation, write application and state views.

use super::{PreparedTask, TaskProgress};
use crate::graph::StateGraph;
use crate::interrupt::{Interrupt, INTERRUPT, NO_WRITES, RESUME};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;
use uuid::Uuid;
use workflow_checkpoint::{ChannelVersions, Checkpoint, PendingWrite};

/// Prefix of the per-node trigger channels
pub(crate) const BRANCH_PREFIX: &str = "branch:to:";

/// Name of the channel that triggers `node`
pub(crate) fn trigger_channel(node: &str) -> String {
    format!("{BRANCH_PREFIX}{node}")
}

/// Channels that belong to the runtime rather than to workflow state
pub(crate) fn is_internal_channel(channel: &str) -> bool {
    channel.starts_with(BRANCH_PREFIX) || channel.starts_with("__")
}

pub(crate) fn task_id(checkpoint_id: &str, node: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{checkpoint_id}:{node}").as_bytes()).to_string()
}

/// Workflow state as seen by nodes: every non-internal channel
pub(crate) fn state_view(checkpoint: &Checkpoint) -> Value {
    Value::Object(
        checkpoint
            .channel_values
            .iter()
            .filter(|(channel, _)| !is_internal_channel(channel))
            .map(|(channel, value)| (channel.clone(), value.clone()))
            .collect(),
    )
}

/// Merge an update object into a state view
pub(crate) fn merged(state: &Value, update: &Map<String, Value>) -> Value {
    let mut merged = state.as_object().cloned().unwrap_or_default();
    for (key, value) in update {
        merged.insert(key.clone(), value.clone());
    }
    Value::Object(merged)
}

/// Nodes whose trigger channel moved past the version they last saw.
///
/// Ordered by node name so task order (and therefore write order) is deterministic.
pub(crate) fn prepare_next_tasks(checkpoint: &Checkpoint, graph: &StateGraph) -> Vec<PreparedTask> {
    graph
        .nodes
        .keys()
        .filter_map(|name| {
            let trigger = trigger_channel(name);
            let version = *checkpoint.channel_versions.get(&trigger)?;
            let seen = checkpoint
                .versions_seen
                .get(name)
                .and_then(|seen| seen.get(&trigger))
                .copied()
                .unwrap_or(0);

            (version > seen).then(|| PreparedTask {
                id: task_id(&checkpoint.id, name),
                name: name.clone(),
                trigger,
                trigger_version: version,
            })
        })
        .collect()
}

/// Reconstruct a task's progress from the pending writes of its checkpoint
pub(crate) fn task_progress(pending_writes: &[PendingWrite], task_id: &str) -> TaskProgress {
    let mut progress = TaskProgress::default();

    for (_, channel, value) in pending_writes.iter().filter(|(task, _, _)| task == task_id) {
        match channel.as_str() {
            INTERRUPT => match serde_json::from_value::<Interrupt>(value.clone()) {
                Ok(interrupt) => progress.interrupt = Some(interrupt),
                Err(e) => warn!(task_id, error = %e, "Ignoring malformed interrupt write"),
            },
            RESUME => {
                progress.resume = match value {
                    Value::Array(values) => values.clone(),
                    other => vec![other.clone()],
                }
            }
            NO_WRITES => progress.completed = true,
            _ => {
                progress.completed = true;
                progress.writes.push((channel.clone(), value.clone()));
            }
        }
    }

    progress
}

/// Fold the writes of a finished superstep into the successor of `previous`.
///
/// Every channel written in the step gets the same new version, one past the highest version
/// in `previous`. Each task records the trigger version it consumed in `versions_seen`.
/// Returns the new checkpoint and the versions that changed.
pub(crate) fn apply_writes(
    previous: Option<&Checkpoint>,
    tasks: &[(PreparedTask, Vec<(String, Value)>)],
    extra_writes: &[(String, Value)],
) -> (Checkpoint, ChannelVersions) {
    let mut next = previous.map(Checkpoint::successor).unwrap_or_else(Checkpoint::empty);
    let new_version = previous.map(Checkpoint::max_version).unwrap_or(0) + 1;
    let mut new_versions = BTreeMap::new();

    for (task, _) in tasks {
        next.versions_seen
            .entry(task.name.clone())
            .or_default()
            .insert(task.trigger.clone(), task.trigger_version);
    }

    let writes = extra_writes
        .iter()
        .chain(tasks.iter().flat_map(|(_, writes)| writes.iter()));

    for (channel, value) in writes {
        next.channel_values.insert(channel.clone(), value.clone());
        next.channel_versions.insert(channel.clone(), new_version);
        new_versions.insert(channel.clone(), new_version);
    }

    (next, new_versions)
}
