//! The checkpoint backend contract
//!
//! [`CheckpointSaver`] is the interface the graph runtime talks to. It persists checkpoints after
//! every superstep, records pending writes for tasks that ran (or interrupted) before the next
//! checkpoint exists, and answers "what is the latest state of this thread" when a workflow is
//! resumed.
//!
//! ```text
//! workflow-graph (CompiledGraph)
//!        │  put() after each superstep
//!        │  put_writes() for task writes / interrupts
//!        │  get_tuple() on resume and get_state()
//!        ▼
//! CheckpointSaver
//!        │
//!   ┌────┴──────────────────────┐
//!   ▼                           ▼
//! InMemoryCheckpointSaver   JsonCheckpointSaver
//! (ephemeral, tests)        (exportable to one JSON blob)
//! ```
//!
//! Implementations must be `Send + Sync`; the trait is object safe so graphs hold it as
//! `Arc<dyn CheckpointSaver>`.

use crate::{
    checkpoint::{
        ChannelVersions, Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointTuple,
    },
    error::Result,
};
use async_trait::async_trait;
use futures::stream::Stream;
use std::collections::HashMap;
use std::pin::Pin;

/// Stream of checkpoint tuples, most recent first
pub type CheckpointStream =
    Pin<Box<dyn Stream<Item = Result<CheckpointTuple>> + Send + 'static>>;

/// Core trait for implementing checkpoint storage backends
///
/// ## Required Methods
///
/// - `get_tuple` - Retrieve the latest (or a specific) checkpoint with its pending writes
/// - `list` - List a thread's checkpoints, newest first
/// - `put` - Store a checkpoint
/// - `put_writes` - Attach pending writes to the current checkpoint
#[async_trait]
pub trait CheckpointSaver: Send + Sync {
    /// Fetch a checkpoint using the given configuration
    async fn get(&self, config: &CheckpointConfig) -> Result<Option<Checkpoint>> {
        Ok(self.get_tuple(config).await?.map(|tuple| tuple.checkpoint))
    }

    /// Fetch a checkpoint tuple.
    ///
    /// Without `checkpoint_id` in the config this is the most recent checkpoint of the thread
    /// and namespace; with it, exactly that checkpoint. `None` when nothing matches.
    async fn get_tuple(&self, config: &CheckpointConfig) -> Result<Option<CheckpointTuple>>;

    /// List checkpoints in reverse chronological order.
    ///
    /// * `config` - restrict to one thread (and namespace); `None` lists every thread
    /// * `filter` - metadata key/value pairs that must all match
    /// * `before` - only checkpoints strictly older than this one
    /// * `limit` - maximum number of tuples
    ///
    /// Implementations may collect every matching tuple before returning; the in-memory savers
    /// clone a snapshot under their read lock, so the stream never holds the lock and does not
    /// see later writes. Pass `limit` to bound that work on large stores.
    async fn list(
        &self,
        config: Option<&CheckpointConfig>,
        filter: Option<HashMap<String, serde_json::Value>>,
        before: Option<&CheckpointConfig>,
        limit: Option<usize>,
    ) -> Result<CheckpointStream>;

    /// Store a checkpoint and return the config that addresses it.
    ///
    /// Storing an id that already exists for the thread overwrites it in place.
    async fn put(
        &self,
        config: &CheckpointConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
        new_versions: ChannelVersions,
    ) -> Result<CheckpointConfig>;

    /// Store intermediate writes proposed by `task_id`.
    ///
    /// The writes attach to the checkpoint addressed by `config` (the current one when the
    /// config carries no `checkpoint_id`). A repeated `(task_id, channel)` pair replaces the
    /// earlier value; all other writes are kept in insertion order.
    async fn put_writes(
        &self,
        config: &CheckpointConfig,
        writes: Vec<(String, serde_json::Value)>,
        task_id: String,
    ) -> Result<()>;

    /// Delete all checkpoints and writes of a thread
    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let _ = thread_id;
        Ok(())
    }
}
