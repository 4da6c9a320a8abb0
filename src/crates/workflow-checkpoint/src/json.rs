//! Exportable checkpoint store
//!
//! [`JsonCheckpointSaver`] behaves exactly like the in-memory saver for every
//! [`CheckpointSaver`] call, and additionally flattens the whole store (all threads, all
//! checkpoints, all pending writes) into one JSON document that can be written to a single file
//! or database row and imported again in another process.
//!
//! # Document shape
//!
//! ```json
//! {
//!   "version": 1,
//!   "threads": {
//!     "mobile-1718000000000-k3j9x2aa": {
//!       "checkpoints": [
//!         {
//!           "checkpointNs": "",
//!           "checkpoint": { "v": 1, "id": "...", "ts": "...", "channel_values": {}, ... },
//!           "metadata": { "source": "input", "step": -1 },
//!           "parentCheckpointId": "..."
//!         }
//!       ],
//!       "pendingWrites": [
//!         { "checkpointNs": "", "checkpointId": "...", "taskId": "...",
//!           "channel": "__interrupt__", "value": { ... } }
//!       ]
//!     }
//!   }
//! }
//! ```
//!
//! `import_state(export_state())` reproduces a store that answers every `get_tuple`/`list`
//! query identically.

use crate::{
    checkpoint::{ChannelVersions, Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointTuple},
    error::{CheckpointError, Result},
    memory::{CheckpointStore, InMemoryCheckpointSaver, ThreadRecord},
    traits::{CheckpointSaver, CheckpointStream},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Version tag of the exported document
pub const STATE_FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct ExportedStateRef<'a> {
    version: u32,
    threads: &'a BTreeMap<String, ThreadRecord>,
}

#[derive(Deserialize)]
struct ExportedState {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    threads: BTreeMap<String, ThreadRecord>,
}

fn default_version() -> u32 {
    STATE_FORMAT_VERSION
}

/// Checkpoint saver whose complete contents can be exported to and imported from JSON
///
/// This is the durable checkpointer: the workflow state manager imports the persisted blob into
/// a fresh instance before a step and exports it afterwards.
#[derive(Debug, Clone, Default)]
pub struct JsonCheckpointSaver {
    inner: InMemoryCheckpointSaver,
}

impl JsonCheckpointSaver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a saver from a previously exported document
    pub async fn from_exported(serialized: &str) -> Result<Self> {
        let saver = Self::new();
        saver.import_state(serialized).await?;
        Ok(saver)
    }

    /// Serialize the entire store to a JSON string
    pub async fn export_state(&self) -> Result<String> {
        let storage = self.inner.storage.read().await;
        let document = ExportedStateRef {
            version: STATE_FORMAT_VERSION,
            threads: &storage.threads,
        };
        Ok(serde_json::to_string(&document)?)
    }

    /// Replace the store's contents with a previously exported document.
    ///
    /// Malformed JSON fails with [`CheckpointError::Serialization`] and leaves the store
    /// untouched.
    pub async fn import_state(&self, serialized: &str) -> Result<()> {
        let document: ExportedState = serde_json::from_str(serialized)?;

        if document.version != STATE_FORMAT_VERSION {
            return Err(CheckpointError::Invalid(format!(
                "unsupported state format version {} (expected {})",
                document.version, STATE_FORMAT_VERSION
            )));
        }

        let mut threads = document.threads;
        for thread in threads.values_mut() {
            thread.sort();
        }

        *self.inner.storage.write().await = CheckpointStore { threads };
        Ok(())
    }

    pub async fn thread_count(&self) -> usize {
        self.inner.thread_count().await
    }

    pub async fn checkpoint_count(&self) -> usize {
        self.inner.checkpoint_count().await
    }

    pub async fn clear(&self) {
        self.inner.clear().await
    }
}

#[async_trait]
impl CheckpointSaver for JsonCheckpointSaver {
    async fn get_tuple(&self, config: &CheckpointConfig) -> Result<Option<CheckpointTuple>> {
        self.inner.get_tuple(config).await
    }

    async fn list(
        &self,
        config: Option<&CheckpointConfig>,
        filter: Option<HashMap<String, serde_json::Value>>,
        before: Option<&CheckpointConfig>,
        limit: Option<usize>,
    ) -> Result<CheckpointStream> {
        self.inner.list(config, filter, before, limit).await
    }

    async fn put(
        &self,
        config: &CheckpointConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
        new_versions: ChannelVersions,
    ) -> Result<CheckpointConfig> {
        self.inner.put(config, checkpoint, metadata, new_versions).await
    }

    async fn put_writes(
        &self,
        config: &CheckpointConfig,
        writes: Vec<(String, serde_json::Value)>,
        task_id: String,
    ) -> Result<()> {
        self.inner.put_writes(config, writes, task_id).await
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.inner.delete_thread(thread_id).await
    }
}
