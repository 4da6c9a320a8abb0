//! In-memory checkpoint storage
//!
//! This module provides **[`InMemoryCheckpointSaver`]**, the ephemeral implementation of
//! [`CheckpointSaver`]. Every test run starts from a clean store and nothing touches the disk.
//! The same storage layout backs [`JsonCheckpointSaver`](crate::json::JsonCheckpointSaver),
//! which adds export/import of the whole store.
//!
//! # Layout
//!
//! ```text
//! Arc<RwLock<CheckpointStore>>
//! └── threads: BTreeMap<thread_id, ThreadRecord>
//!     ├── "mobile-1718000000000-k3j9x2aa"
//!     │   ├── checkpoints     sorted by (ts, id), every namespace interleaved
//!     │   │   ├── [0] StoredCheckpoint (step -1, source input)
//!     │   │   ├── [1] StoredCheckpoint (step 0, source loop)
//!     │   │   └── [2] StoredCheckpoint (step 1, source loop)
//!     │   └── pending_writes  insertion order, each tagged with (ns, checkpoint_id, task_id)
//!     └── "mobile-1718000000123-p0q8r7ss"
//!         └── ...
//! ```
//!
//! The thread map is a `BTreeMap` and records are plain serde structs, so the exported
//! document is deterministic for a given store.

use crate::{
    checkpoint::{
        ChannelVersions, Checkpoint, CheckpointConfig, CheckpointId, CheckpointMetadata,
        CheckpointTuple, PendingWrite, ROOT_NAMESPACE,
    },
    error::{CheckpointError, Result},
    traits::{CheckpointSaver, CheckpointStream},
};
use async_trait::async_trait;
use futures::stream;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A checkpoint as stored in a thread's history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredCheckpoint {
    #[serde(default)]
    pub checkpoint_ns: String,
    pub checkpoint: Checkpoint,
    #[serde(default)]
    pub metadata: CheckpointMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_checkpoint_id: Option<CheckpointId>,
}

/// A pending write attached to one checkpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredWrite {
    #[serde(default)]
    pub checkpoint_ns: String,
    pub checkpoint_id: CheckpointId,
    pub task_id: String,
    pub channel: String,
    pub value: serde_json::Value,
}

/// Everything stored for one thread
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ThreadRecord {
    #[serde(default)]
    pub checkpoints: Vec<StoredCheckpoint>,
    #[serde(default)]
    pub pending_writes: Vec<StoredWrite>,
}

impl ThreadRecord {
    /// Restore the `(ts, id)` order; stable so equal keys keep insertion order
    pub fn sort(&mut self) {
        self.checkpoints
            .sort_by(|a, b| a.checkpoint.order_key().cmp(&b.checkpoint.order_key()));
    }

    fn latest(&self, ns: &str) -> Option<&StoredCheckpoint> {
        self.checkpoints.iter().rev().find(|c| c.checkpoint_ns == ns)
    }

    fn find(&self, ns: &str, checkpoint_id: &str) -> Option<&StoredCheckpoint> {
        self.checkpoints
            .iter()
            .find(|c| c.checkpoint_ns == ns && c.checkpoint.id == checkpoint_id)
    }

    fn writes_for(&self, ns: &str, checkpoint_id: &str) -> Vec<PendingWrite> {
        self.pending_writes
            .iter()
            .filter(|w| w.checkpoint_ns == ns && w.checkpoint_id == checkpoint_id)
            .map(|w| (w.task_id.clone(), w.channel.clone(), w.value.clone()))
            .collect()
    }

    fn to_tuple(&self, thread_id: &str, stored: &StoredCheckpoint) -> CheckpointTuple {
        let config = address(thread_id, &stored.checkpoint_ns, Some(&stored.checkpoint.id));
        let tuple = CheckpointTuple::new(
            config,
            stored.checkpoint.clone(),
            stored.metadata.clone(),
        )
        .with_pending_writes(self.writes_for(&stored.checkpoint_ns, &stored.checkpoint.id));

        match &stored.parent_checkpoint_id {
            Some(parent_id) => {
                tuple.with_parent_config(address(thread_id, &stored.checkpoint_ns, Some(parent_id)))
            }
            None => tuple,
        }
    }
}

/// The complete contents of an in-memory store
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub(crate) struct CheckpointStore {
    #[serde(default)]
    pub threads: BTreeMap<String, ThreadRecord>,
}

fn address(thread_id: &str, ns: &str, checkpoint_id: Option<&String>) -> CheckpointConfig {
    CheckpointConfig {
        thread_id: Some(thread_id.to_string()),
        checkpoint_id: checkpoint_id.cloned(),
        checkpoint_ns: (ns != ROOT_NAMESPACE).then(|| ns.to_string()),
    }
}

fn require_thread_id(config: &CheckpointConfig) -> Result<&str> {
    config
        .thread_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| CheckpointError::Invalid("thread_id is required".to_string()))
}

/// Thread-safe in-memory checkpoint storage
type SharedStore = Arc<RwLock<CheckpointStore>>;

/// In-memory checkpoint saver implementation
///
/// Suitable for tests and ephemeral runs. Clones share the same underlying store.
///
/// # Example
///
/// ```rust
/// use workflow_checkpoint::{
///     Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointSaver, InMemoryCheckpointSaver,
/// };
/// use std::collections::BTreeMap;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let saver = InMemoryCheckpointSaver::new();
///     let config = CheckpointConfig::for_thread("thread-1");
///
///     let saved = saver
///         .put(&config, Checkpoint::empty(), CheckpointMetadata::new(), BTreeMap::new())
///         .await?;
///     assert!(saver.get_tuple(&saved).await?.is_some());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryCheckpointSaver {
    pub(crate) storage: SharedStore,
}

impl InMemoryCheckpointSaver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of threads being tracked
    pub async fn thread_count(&self) -> usize {
        self.storage.read().await.threads.len()
    }

    /// Get the total number of checkpoints across all threads
    pub async fn checkpoint_count(&self) -> usize {
        self.storage
            .read()
            .await
            .threads
            .values()
            .map(|thread| thread.checkpoints.len())
            .sum()
    }

    /// Clear all checkpoints and writes
    pub async fn clear(&self) {
        self.storage.write().await.threads.clear();
    }
}

#[async_trait]
impl CheckpointSaver for InMemoryCheckpointSaver {
    async fn get_tuple(&self, config: &CheckpointConfig) -> Result<Option<CheckpointTuple>> {
        let thread_id = require_thread_id(config)?;
        let ns = config.namespace();
        let storage = self.storage.read().await;

        let Some(thread) = storage.threads.get(thread_id) else {
            return Ok(None);
        };

        let stored = match &config.checkpoint_id {
            Some(checkpoint_id) => thread.find(ns, checkpoint_id),
            None => thread.latest(ns),
        };

        Ok(stored.map(|s| thread.to_tuple(thread_id, s)))
    }

    async fn list(
        &self,
        config: Option<&CheckpointConfig>,
        filter: Option<HashMap<String, serde_json::Value>>,
        before: Option<&CheckpointConfig>,
        limit: Option<usize>,
    ) -> Result<CheckpointStream> {
        let storage = self.storage.read().await;
        let limit = limit.unwrap_or(usize::MAX);
        let mut results = Vec::new();

        let scoped_thread = config.and_then(|c| c.thread_id.as_deref()).filter(|t| !t.is_empty());
        let scoped_ns = config.map(|c| c.namespace());

        let threads: Vec<(&String, &ThreadRecord)> = match scoped_thread {
            Some(thread_id) => storage.threads.get_key_value(thread_id).into_iter().collect(),
            None => storage.threads.iter().collect(),
        };

        'threads: for (thread_id, thread) in threads {
            // Checkpoints at or after the `before` marker are skipped
            let boundary = before.and_then(|b| b.checkpoint_id.as_ref()).map(|before_id| {
                thread
                    .checkpoints
                    .iter()
                    .find(|c| &c.checkpoint.id == before_id)
                    .map(|c| (c.checkpoint.ts, c.checkpoint.id.clone()))
                    .ok_or_else(|| before_id.clone())
            });

            for stored in thread.checkpoints.iter().rev() {
                if results.len() >= limit {
                    break 'threads;
                }
                if scoped_ns.is_some_and(|ns| ns != stored.checkpoint_ns) {
                    continue;
                }
                match &boundary {
                    Some(Ok((ts, id))) => {
                        if (stored.checkpoint.ts, &stored.checkpoint.id) >= (*ts, id) {
                            continue;
                        }
                    }
                    Some(Err(before_id)) => {
                        if &stored.checkpoint.id >= before_id {
                            continue;
                        }
                    }
                    None => {}
                }
                if let Some(filter_map) = &filter {
                    if !stored.metadata.matches(filter_map) {
                        continue;
                    }
                }

                results.push(Ok(thread.to_tuple(thread_id, stored)));
            }
        }

        Ok(Box::pin(stream::iter(results)))
    }

    async fn put(
        &self,
        config: &CheckpointConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
        _new_versions: ChannelVersions,
    ) -> Result<CheckpointConfig> {
        let thread_id = require_thread_id(config)?.to_string();
        let ns = config.namespace().to_string();
        let checkpoint_id = checkpoint.id.clone();

        let mut storage = self.storage.write().await;
        let thread = storage.threads.entry(thread_id.clone()).or_default();

        let stored = StoredCheckpoint {
            checkpoint_ns: ns.clone(),
            checkpoint,
            metadata,
            parent_checkpoint_id: config
                .checkpoint_id
                .clone()
                .filter(|parent| parent != &checkpoint_id),
        };

        match thread
            .checkpoints
            .iter_mut()
            .find(|c| c.checkpoint_ns == ns && c.checkpoint.id == checkpoint_id)
        {
            Some(existing) => *existing = stored,
            None => thread.checkpoints.push(stored),
        }
        thread.sort();

        Ok(address(&thread_id, &ns, Some(&checkpoint_id)))
    }

    async fn put_writes(
        &self,
        config: &CheckpointConfig,
        writes: Vec<(String, serde_json::Value)>,
        task_id: String,
    ) -> Result<()> {
        let thread_id = require_thread_id(config)?;
        let ns = config.namespace();
        let mut storage = self.storage.write().await;

        let thread = storage
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| CheckpointError::NotFound(format!("no checkpoints for thread {}", thread_id)))?;

        let checkpoint_id = match &config.checkpoint_id {
            Some(id) => thread.find(ns, id).map(|c| c.checkpoint.id.clone()),
            None => thread.latest(ns).map(|c| c.checkpoint.id.clone()),
        }
        .ok_or_else(|| {
            CheckpointError::NotFound(format!(
                "{} in thread {}",
                config.checkpoint_id.as_deref().unwrap_or("current checkpoint"),
                thread_id
            ))
        })?;

        for (channel, value) in writes {
            let existing = thread.pending_writes.iter_mut().find(|w| {
                w.checkpoint_ns == ns
                    && w.checkpoint_id == checkpoint_id
                    && w.task_id == task_id
                    && w.channel == channel
            });

            match existing {
                Some(write) => write.value = value,
                None => thread.pending_writes.push(StoredWrite {
                    checkpoint_ns: ns.to_string(),
                    checkpoint_id: checkpoint_id.clone(),
                    task_id: task_id.clone(),
                    channel,
                    value,
                }),
            }
        }

        Ok(())
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.storage.write().await.threads.remove(thread_id);
        Ok(())
    }
}
