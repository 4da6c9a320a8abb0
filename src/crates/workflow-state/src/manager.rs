//! Workflow state managers
//!
//! A [`StateManager`] hands out the checkpointer a workflow step runs against and persists it
//! afterwards. The environment picks the implementation once, at startup:
//!
//! - [`EphemeralStateManager`] (`test`): a fresh [`InMemoryCheckpointSaver`] per call, no storage
//! - [`DurableStateManager`] (`production`): a [`JsonCheckpointSaver`] loaded from and saved to a
//!   [`StatePersistence`]
//!
//! Each manager only accepts its own checkpointer type, so a durable checkpointer can never be
//! handed to the ephemeral manager (or the reverse).

use crate::config::{WorkflowConfig, WorkflowEnvironment};
use crate::error::{Result, StateError};
use crate::persistence::{FileStatePersistence, StatePersistence};
use crate::sqlite::{SqliteStatePersistence, DEFAULT_STATE_KEY};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};
use workflow_checkpoint::{CheckpointSaver, InMemoryCheckpointSaver, JsonCheckpointSaver};

/// Creates and saves the checkpointer backing a workflow
#[async_trait]
pub trait StateManager: Send + Sync {
    type Checkpointer: CheckpointSaver + 'static;

    fn environment(&self) -> WorkflowEnvironment;

    /// Checkpointer loaded with whatever state this manager keeps
    async fn create_checkpointer(&self) -> Result<Arc<Self::Checkpointer>>;

    /// Persist the checkpointer's contents
    async fn save_checkpointer_state(&self, checkpointer: &Self::Checkpointer) -> Result<()>;

    async fn clear_state(&self) -> Result<()>;

    async fn state_exists(&self) -> Result<bool>;
}

/// In-memory state for tests: nothing is read or written
#[derive(Debug, Clone, Copy, Default)]
pub struct EphemeralStateManager;

impl EphemeralStateManager {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StateManager for EphemeralStateManager {
    type Checkpointer = InMemoryCheckpointSaver;

    fn environment(&self) -> WorkflowEnvironment {
        WorkflowEnvironment::Test
    }

    async fn create_checkpointer(&self) -> Result<Arc<InMemoryCheckpointSaver>> {
        debug!("Creating ephemeral checkpointer");
        Ok(Arc::new(InMemoryCheckpointSaver::new()))
    }

    async fn save_checkpointer_state(&self, _checkpointer: &InMemoryCheckpointSaver) -> Result<()> {
        Ok(())
    }

    async fn clear_state(&self) -> Result<()> {
        Ok(())
    }

    async fn state_exists(&self) -> Result<bool> {
        Ok(false)
    }
}

/// Persistent state: the whole checkpoint store round-trips through `P` on every step
#[derive(Debug, Clone)]
pub struct DurableStateManager<P = FileStatePersistence> {
    persistence: P,
}

impl<P: StatePersistence> DurableStateManager<P> {
    pub fn new(persistence: P) -> Self {
        Self { persistence }
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }
}

impl DurableStateManager<FileStatePersistence> {
    /// File-backed manager at the configured well-known location
    pub fn from_config(config: &WorkflowConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(FileStatePersistence::new(config.state_file_path()?)))
    }
}

impl DurableStateManager<SqliteStatePersistence> {
    /// SQLite-backed manager at the configured well-known location
    pub async fn sqlite_from_config(config: &WorkflowConfig) -> Result<Self> {
        config.validate()?;
        let persistence =
            SqliteStatePersistence::connect(config.database_path()?, DEFAULT_STATE_KEY).await?;
        Ok(Self::new(persistence))
    }
}

#[async_trait]
impl<P: StatePersistence> StateManager for DurableStateManager<P> {
    type Checkpointer = JsonCheckpointSaver;

    fn environment(&self) -> WorkflowEnvironment {
        WorkflowEnvironment::Production
    }

    async fn create_checkpointer(&self) -> Result<Arc<JsonCheckpointSaver>> {
        let checkpointer = JsonCheckpointSaver::new();

        match self.persistence.read_state().await? {
            Some(serialized) => {
                checkpointer
                    .import_state(&serialized)
                    .await
                    .map_err(StateError::Checkpoint)?;
                let threads = checkpointer.thread_count().await;
                info!(threads, "Loaded persisted workflow state");
            }
            None => debug!("No usable persisted workflow state, starting empty"),
        }

        Ok(Arc::new(checkpointer))
    }

    async fn save_checkpointer_state(&self, checkpointer: &JsonCheckpointSaver) -> Result<()> {
        let serialized = checkpointer.export_state().await?;
        self.persistence.write_state(&serialized).await?;
        debug!(bytes = serialized.len(), "Saved workflow state");
        Ok(())
    }

    async fn clear_state(&self) -> Result<()> {
        self.persistence.clear_state().await
    }

    async fn state_exists(&self) -> Result<bool> {
        self.persistence.state_exists().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;
    use workflow_checkpoint::{Checkpoint, CheckpointConfig, CheckpointMetadata};

    /// Persistence double that counts every call
    #[derive(Default)]
    struct RecordingPersistence {
        calls: AtomicUsize,
        stored: Mutex<Option<String>>,
    }

    impl RecordingPersistence {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatePersistence for RecordingPersistence {
        async fn write_state(&self, serialized: &str) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.stored.lock().unwrap() = Some(serialized.to_string());
            Ok(())
        }

        async fn read_state(&self) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.stored.lock().unwrap().clone())
        }

        async fn state_exists(&self) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.stored.lock().unwrap().is_some())
        }

        async fn clear_state(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.stored.lock().unwrap() = None;
            Ok(())
        }
    }

    async fn put_one(saver: &dyn CheckpointSaver, thread: &str) {
        saver
            .put(
                &CheckpointConfig::for_thread(thread),
                Checkpoint::empty(),
                CheckpointMetadata::new(),
                BTreeMap::new(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_ephemeral_never_touches_storage() {
        let dir = TempDir::new().unwrap();
        let config = WorkflowConfig::new(WorkflowEnvironment::Test).with_project_path(dir.path());
        let manager = EphemeralStateManager::new();

        let checkpointer = manager.create_checkpointer().await.unwrap();
        put_one(checkpointer.as_ref(), "thread-1").await;
        manager.save_checkpointer_state(&checkpointer).await.unwrap();

        assert!(!manager.state_exists().await.unwrap());
        assert!(!config.state_dir().unwrap().exists());

        // Every checkpointer starts clean
        let fresh = manager.create_checkpointer().await.unwrap();
        assert_eq!(fresh.thread_count().await, 0);
    }

    #[tokio::test]
    async fn test_durable_without_prior_state_starts_empty() {
        let dir = TempDir::new().unwrap();
        let config = WorkflowConfig::default().with_project_path(dir.path());
        let manager = DurableStateManager::from_config(&config).unwrap();

        let checkpointer = manager.create_checkpointer().await.unwrap();
        assert_eq!(checkpointer.thread_count().await, 0);
        assert!(!manager.state_exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_durable_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let config = WorkflowConfig::default().with_project_path(dir.path());
        let manager = DurableStateManager::from_config(&config).unwrap();

        let checkpointer = manager.create_checkpointer().await.unwrap();
        put_one(checkpointer.as_ref(), "thread-a").await;
        put_one(checkpointer.as_ref(), "thread-b").await;
        manager.save_checkpointer_state(&checkpointer).await.unwrap();

        assert!(config.state_file_path().unwrap().is_file());

        // A later invocation, possibly another process
        let manager = DurableStateManager::from_config(&config).unwrap();
        let reloaded = manager.create_checkpointer().await.unwrap();
        assert_eq!(reloaded.thread_count().await, 2);
        assert!(reloaded
            .get_tuple(&CheckpointConfig::for_thread("thread-a"))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_durable_load_runs_on_spawned_task() {
        let dir = TempDir::new().unwrap();
        let config = WorkflowConfig::default().with_project_path(dir.path());
        let manager = DurableStateManager::from_config(&config).unwrap();

        let checkpointer = manager.create_checkpointer().await.unwrap();
        put_one(checkpointer.as_ref(), "thread-a").await;
        manager.save_checkpointer_state(&checkpointer).await.unwrap();

        // tokio::spawn requires the loading future to be Send
        let reloaded = tokio::spawn(async move { manager.create_checkpointer().await })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.thread_count().await, 1);
    }

    #[tokio::test]
    async fn test_durable_with_corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let config = WorkflowConfig::default().with_project_path(dir.path());
        let path = config.state_file_path().unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "garbage").unwrap();

        let manager = DurableStateManager::from_config(&config).unwrap();
        let checkpointer = manager.create_checkpointer().await.unwrap();
        assert_eq!(checkpointer.thread_count().await, 0);
    }

    #[tokio::test]
    async fn test_durable_clear_passes_through() {
        let manager = DurableStateManager::new(RecordingPersistence::default());

        let checkpointer = manager.create_checkpointer().await.unwrap();
        put_one(checkpointer.as_ref(), "thread-1").await;
        manager.save_checkpointer_state(&checkpointer).await.unwrap();
        assert!(manager.state_exists().await.unwrap());

        manager.clear_state().await.unwrap();
        assert!(!manager.state_exists().await.unwrap());
        // read, write, exists, clear, exists
        assert_eq!(manager.persistence().calls(), 5);
    }

    #[tokio::test]
    async fn test_sqlite_backed_manager_round_trips() {
        let dir = TempDir::new().unwrap();
        let config = WorkflowConfig::default().with_project_path(dir.path());
        let manager = DurableStateManager::sqlite_from_config(&config).await.unwrap();

        let checkpointer = manager.create_checkpointer().await.unwrap();
        put_one(checkpointer.as_ref(), "thread-1").await;
        manager.save_checkpointer_state(&checkpointer).await.unwrap();

        let reloaded = manager.create_checkpointer().await.unwrap();
        assert_eq!(reloaded.thread_count().await, 1);
    }
}
