//! # workflow-checkpoint - Checkpoint Storage for Workflow Threads
//!
//! **Trait-based checkpoint storage** for the workflow graph runtime. A checkpoint is a snapshot
//! of one workflow thread's channel values taken after each superstep; storing them lets a
//! workflow stop at an interrupt, survive a process restart, and continue from where it paused.
//!
//! ## Core Concepts
//!
//! ### 1. CheckpointSaver Trait
//!
//! The [`CheckpointSaver`] trait defines the interface the graph runtime talks to:
//!
//! - **`put()`** - Save a checkpoint with its metadata
//! - **`get_tuple()`** - Retrieve the latest (or a specific) checkpoint with pending writes
//! - **`list()`** - Query checkpoint history, newest first
//! - **`put_writes()`** - Attach task writes (including interrupts) to a checkpoint
//!
//! ### 2. Implementations
//!
//! - [`InMemoryCheckpointSaver`] - Ephemeral store, used for tests and throwaway runs
//! - [`JsonCheckpointSaver`] - Same store, plus [`export_state`](JsonCheckpointSaver::export_state)
//!   and [`import_state`](JsonCheckpointSaver::import_state) of the whole store as one JSON
//!   document, which the state persistence layer writes to disk
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use workflow_checkpoint::{
//!     Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointSaver, JsonCheckpointSaver,
//! };
//! use std::collections::BTreeMap;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let saver = JsonCheckpointSaver::new();
//!     let config = CheckpointConfig::for_thread("mobile-1718000000000-k3j9x2aa");
//!
//!     saver
//!         .put(&config, Checkpoint::empty(), CheckpointMetadata::new(), BTreeMap::new())
//!         .await?;
//!
//!     // Flatten everything into one string...
//!     let blob = saver.export_state().await?;
//!
//!     // ...and restore it in another process
//!     let restored = JsonCheckpointSaver::from_exported(&blob).await?;
//!     assert!(restored.get_tuple(&config).await?.is_some());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`checkpoint`] - `Checkpoint`, `CheckpointConfig`, `CheckpointMetadata`, `CheckpointTuple`
//! - [`traits`] - `CheckpointSaver` trait
//! - [`memory`] - In-memory implementation
//! - [`json`] - Exportable implementation
//! - [`error`] - Error types

pub mod checkpoint;
pub mod error;
pub mod json;
pub mod memory;
pub mod traits;

// Re-export main types
pub use checkpoint::{
    ChannelVersion, ChannelVersions, Checkpoint, CheckpointConfig, CheckpointId,
    CheckpointMetadata, CheckpointSource, CheckpointTuple, PendingWrite, ROOT_NAMESPACE,
};
pub use error::{CheckpointError, Result};
pub use json::{JsonCheckpointSaver, STATE_FORMAT_VERSION};
pub use memory::InMemoryCheckpointSaver;
pub use traits::{CheckpointSaver, CheckpointStream};
