//! # workflow-state - Durable Workflow State
//!
//! Keeps the checkpoint store of a long-running workflow alive between process invocations.
//!
//! ## Layers
//!
//! - [`StatePersistence`] - store one serialized state string
//!   - [`FileStatePersistence`] - atomic temp-file-then-rename writes; corrupt or missing files
//!     read as `None`
//!   - [`SqliteStatePersistence`] - one row per workflow key, transactional upsert
//! - [`StateManager`] - hand out the checkpointer for a step and persist it afterwards
//!   - [`EphemeralStateManager`] - `test` environment, in memory only
//!   - [`DurableStateManager`] - `production` environment, loads and saves through a persistence
//! - [`WorkflowConfig`] - environment, storage backend, project path and file name from
//!   `WORKFLOW_*` variables
//!
//! ## Example
//!
//! ```rust,no_run
//! use workflow_state::{DurableStateManager, StateManager, WorkflowConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WorkflowConfig::from_env()?;
//!     let manager = DurableStateManager::from_config(&config)?;
//!
//!     let checkpointer = manager.create_checkpointer().await?;
//!     // ... run one workflow step against `checkpointer` ...
//!     manager.save_checkpointer_state(&checkpointer).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod manager;
pub mod paths;
pub mod persistence;
pub mod sqlite;

pub use config::{
    StateBackend, WorkflowConfig, WorkflowEnvironment, ENVIRONMENT_VAR, PROJECT_PATH_VAR, STATE_BACKEND_VAR,
    STATE_FILE_VAR,
};
pub use error::{Result, StateError};
pub use manager::{DurableStateManager, EphemeralStateManager, StateManager};
pub use paths::{well_known_dir, DEFAULT_DATABASE_FILE, DEFAULT_STATE_FILE, WELL_KNOWN_DIR_NAME};
pub use persistence::{FileStatePersistence, StatePersistence};
pub use sqlite::{SqliteStatePersistence, DEFAULT_STATE_KEY};
