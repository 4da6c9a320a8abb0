//! Core checkpoint data structures
//!
//! This module defines the types every checkpoint backend stores and returns:
//! **[`Checkpoint`]**, **[`CheckpointConfig`]**, **[`CheckpointMetadata`]** and
//! **[`CheckpointTuple`]**. A checkpoint is a snapshot of one workflow thread's channel values
//! at one execution step; the config addresses it; the metadata says where it came from.
//!
//! # Structure
//!
//! ```text
//! CheckpointTuple
//! ├── config           thread_id / checkpoint_ns / checkpoint_id
//! ├── checkpoint
//! │   ├── v            schema version (1)
//! │   ├── id           time-ordered UUIDv7
//! │   ├── ts           RFC 3339 timestamp
//! │   ├── channel_values    { "userInput": ..., "buildSuccessful": ... }
//! │   ├── channel_versions  { "userInput": 3, "buildSuccessful": 1 }
//! │   └── versions_seen     { "build": { "branch:to:build": 1 } }
//! ├── metadata         source / step / parents / extra
//! ├── parent_config    config of the checkpoint this one was derived from
//! └── pending_writes   [(task_id, channel, value), ...]
//! ```
//!
//! # Ordering
//!
//! Within a thread (and namespace) checkpoints are totally ordered by `(ts, id)`. Ids are
//! UUIDv7, so ids minted later in the same process also sort later; the timestamp keeps the
//! order stable across processes whose clocks agree.
//!
//! # Versions seen
//!
//! `versions_seen` records, per node, the channel versions the node observed the last time it
//! ran. A node whose trigger channel has moved past the recorded version is eligible to run
//! next:
//!
//! ```text
//!   channel "branch:to:build" is at version 2
//!   node "build" has seen version 1   → "build" runs next
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Checkpoint ID type
pub type CheckpointId = String;

/// Pending write tuple: (task_id, channel, value)
///
/// A write proposed by a task that has not been folded into a checkpoint's channel values yet.
pub type PendingWrite = (String, String, serde_json::Value);

/// Monotonic per-channel version counter
pub type ChannelVersion = u64;

/// Mapping from channel name to version
pub type ChannelVersions = BTreeMap<String, ChannelVersion>;

/// Default checkpoint namespace (the root graph)
pub const ROOT_NAMESPACE: &str = "";

/// Metadata source type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointSource {
    /// Checkpoint created from an input to invoke
    Input,
    /// Checkpoint created from inside the superstep loop
    Loop,
    /// Checkpoint created from a manual state update
    Update,
    /// Checkpoint created as a copy of another checkpoint
    Fork,
}

impl CheckpointSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointSource::Input => "input",
            CheckpointSource::Loop => "loop",
            CheckpointSource::Update => "update",
            CheckpointSource::Fork => "fork",
        }
    }
}

/// Metadata associated with a checkpoint
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CheckpointMetadata {
    /// The source of the checkpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<CheckpointSource>,

    /// The step number of the checkpoint
    /// -1 for the first "input" checkpoint
    /// 0 for the first "loop" checkpoint
    /// n for the nth checkpoint afterwards
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<i64>,

    /// Mapping from checkpoint namespace to parent checkpoint ID
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parents: BTreeMap<String, CheckpointId>,

    /// Additional custom metadata
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl CheckpointMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: CheckpointSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_step(mut self, step: i64) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_parent(mut self, namespace: impl Into<String>, checkpoint_id: impl Into<String>) -> Self {
        self.parents.insert(namespace.into(), checkpoint_id.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Check whether this metadata matches a `list()` filter.
    ///
    /// `source` and `step` are matched against their typed fields, every other key against
    /// `extra`.
    pub fn matches(&self, filter: &HashMap<String, serde_json::Value>) -> bool {
        filter.iter().all(|(key, expected)| match key.as_str() {
            "source" => self
                .source
                .map(|s| expected.as_str() == Some(s.as_str()))
                .unwrap_or(false),
            "step" => self.step.is_some() && expected.as_i64() == self.step,
            _ => self.extra.get(key) == Some(expected),
        })
    }
}

/// State snapshot at a given point in time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    /// The version of the checkpoint format
    pub v: u32,

    /// The ID of the checkpoint (unique within a thread, time ordered)
    pub id: CheckpointId,

    /// The timestamp of the checkpoint
    pub ts: DateTime<Utc>,

    /// Channel name to value
    pub channel_values: BTreeMap<String, serde_json::Value>,

    /// Channel name to version counter
    pub channel_versions: ChannelVersions,

    /// Node name to the channel versions it last observed
    pub versions_seen: BTreeMap<String, ChannelVersions>,
}

impl Checkpoint {
    /// Current checkpoint format version
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new(
        channel_values: BTreeMap<String, serde_json::Value>,
        channel_versions: ChannelVersions,
        versions_seen: BTreeMap<String, ChannelVersions>,
    ) -> Self {
        Self {
            v: Self::CURRENT_VERSION,
            id: Self::next_id(),
            ts: Utc::now(),
            channel_values,
            channel_versions,
            versions_seen,
        }
    }

    pub fn empty() -> Self {
        Self::new(BTreeMap::new(), BTreeMap::new(), BTreeMap::new())
    }

    /// Mint a new time-ordered checkpoint ID
    pub fn next_id() -> CheckpointId {
        Uuid::now_v7().to_string()
    }

    /// Derive the successor of this checkpoint: same channels, fresh id and timestamp.
    ///
    /// The timestamp never goes backwards relative to `self`, even if the wall clock does.
    pub fn successor(&self) -> Self {
        let now = Utc::now();
        Self {
            v: Self::CURRENT_VERSION,
            id: Self::next_id(),
            ts: if now < self.ts { self.ts } else { now },
            channel_values: self.channel_values.clone(),
            channel_versions: self.channel_versions.clone(),
            versions_seen: self.versions_seen.clone(),
        }
    }

    /// Sort key implementing the total order `(ts, id)`
    pub fn order_key(&self) -> (DateTime<Utc>, &str) {
        (self.ts, self.id.as_str())
    }

    /// Highest version currently assigned to any channel
    pub fn max_version(&self) -> ChannelVersion {
        self.channel_versions.values().copied().max().unwrap_or(0)
    }
}

/// Configuration for checkpoint operations
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CheckpointConfig {
    /// Thread ID for grouping related checkpoints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    /// Specific checkpoint ID to address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_id: Option<CheckpointId>,

    /// Checkpoint namespace (sub-graph); `None` means the root namespace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_ns: Option<String>,
}

impl CheckpointConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config addressing the latest checkpoint of a thread
    pub fn for_thread(thread_id: impl Into<String>) -> Self {
        Self::new().with_thread_id(thread_id)
    }

    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_checkpoint_id(mut self, checkpoint_id: impl Into<CheckpointId>) -> Self {
        self.checkpoint_id = Some(checkpoint_id.into());
        self
    }

    pub fn with_checkpoint_ns(mut self, checkpoint_ns: impl Into<String>) -> Self {
        self.checkpoint_ns = Some(checkpoint_ns.into());
        self
    }

    /// Namespace this config refers to, defaulting to the root namespace
    pub fn namespace(&self) -> &str {
        self.checkpoint_ns.as_deref().unwrap_or(ROOT_NAMESPACE)
    }

    /// Same thread and namespace, without a specific checkpoint
    pub fn latest(&self) -> Self {
        Self {
            thread_id: self.thread_id.clone(),
            checkpoint_id: None,
            checkpoint_ns: self.checkpoint_ns.clone(),
        }
    }
}

/// A checkpoint together with everything needed to resume from it
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointTuple {
    /// Config addressing exactly this checkpoint
    pub config: CheckpointConfig,

    pub checkpoint: Checkpoint,

    pub metadata: CheckpointMetadata,

    /// Config of the checkpoint this one was derived from (if any)
    pub parent_config: Option<CheckpointConfig>,

    /// Writes attached to this checkpoint, in insertion order
    pub pending_writes: Vec<PendingWrite>,
}

impl CheckpointTuple {
    pub fn new(
        config: CheckpointConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
    ) -> Self {
        Self {
            config,
            checkpoint,
            metadata,
            parent_config: None,
            pending_writes: Vec::new(),
        }
    }

    pub fn with_parent_config(mut self, parent_config: CheckpointConfig) -> Self {
        self.parent_config = Some(parent_config);
        self
    }

    pub fn with_pending_writes(mut self, pending_writes: Vec<PendingWrite>) -> Self {
        self.pending_writes = pending_writes;
        self
    }

    /// Pending writes proposed by one task
    pub fn writes_for_task<'a>(&'a self, task_id: &'a str) -> impl Iterator<Item = &'a PendingWrite> {
        self.pending_writes.iter().filter(move |(t, _, _)| t == task_id)
    }
}
