//! Durable storage for the exported checkpoint document
//!
//! [`FileStatePersistence`] keeps one JSON file per workflow deployment. A write goes to
//! `<file>.tmp` in the same directory, is flushed to disk and then renamed over the canonical
//! path, so a reader only ever sees the previous complete document or the new one.
//!
//! Only one writer process per state file is supported; concurrent writers race and the last
//! complete rename wins.

use crate::error::{Result, StateError};
use async_trait::async_trait;
use serde::de::IgnoredAny;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

/// Storage for a single serialized state string
#[async_trait]
pub trait StatePersistence: Send + Sync {
    /// Validate and durably store `serialized`, replacing any previous state.
    ///
    /// Fails with [`StateError::InvalidJson`] without touching storage when the input does not
    /// parse.
    async fn write_state(&self, serialized: &str) -> Result<()>;

    /// The stored state, or `None` when nothing is stored or the stored content is corrupt
    async fn read_state(&self) -> Result<Option<String>>;

    async fn state_exists(&self) -> Result<bool>;

    /// Remove the stored state. Removing absent state succeeds.
    async fn clear_state(&self) -> Result<()>;
}

/// Reject anything that is not syntactically valid JSON
pub(crate) fn validate_json(serialized: &str) -> Result<()> {
    serde_json::from_str::<IgnoredAny>(serialized)
        .map(|_| ())
        .map_err(StateError::InvalidJson)
}

/// File-backed state persistence with atomic replace
#[derive(Debug, Clone)]
pub struct FileStatePersistence {
    path: PathBuf,
}

impl FileStatePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Canonical state file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Temporary path used while writing, co-located with the canonical file
    pub fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    async fn write_atomically(&self, serialized: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StateError::io(parent, e))?;
        }

        let temp_path = self.temp_path();
        let mut file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| StateError::io(&temp_path, e))?;
        file.write_all(serialized.as_bytes())
            .await
            .map_err(|e| StateError::io(&temp_path, e))?;
        file.sync_all()
            .await
            .map_err(|e| StateError::io(&temp_path, e))?;
        drop(file);

        // The rename is the only step that makes new state visible
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| StateError::io(&self.path, e))?;

        // Best effort: make the rename itself durable
        #[cfg(unix)]
        {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                if let Ok(dir) = tokio::fs::File::open(parent).await {
                    let _ = dir.sync_all().await;
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl StatePersistence for FileStatePersistence {
    async fn write_state(&self, serialized: &str) -> Result<()> {
        validate_json(serialized)?;

        if let Err(e) = self.write_atomically(serialized).await {
            error!(path = %self.path.display(), error = %e, "Failed to write workflow state");
            let _ = tokio::fs::remove_file(self.temp_path()).await;
            return Err(e);
        }

        debug!(path = %self.path.display(), bytes = serialized.len(), "Workflow state written");
        Ok(())
    }

    async fn read_state(&self) -> Result<Option<String>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No persisted workflow state");
                return Ok(None);
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                warn!(path = %self.path.display(), "Persisted workflow state is not UTF-8, ignoring it");
                return Ok(None);
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Failed to read workflow state");
                return Err(StateError::io(&self.path, e));
            }
        };

        if let Err(e) = validate_json(&content) {
            warn!(path = %self.path.display(), error = %e, "Persisted workflow state is corrupt, ignoring it");
            return Ok(None);
        }

        Ok(Some(content))
    }

    async fn state_exists(&self) -> Result<bool> {
        Ok(tokio::fs::metadata(&self.path)
            .await
            .map(|metadata| metadata.is_file())
            .unwrap_or(false))
    }

    async fn clear_state(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(path = %self.path.display(), "Workflow state cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Failed to clear workflow state");
                Err(StateError::io(&self.path, e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn persistence_in(dir: &TempDir) -> FileStatePersistence {
        FileStatePersistence::new(dir.path().join("nested").join("workflow-state.json"))
    }

    #[tokio::test]
    async fn test_write_then_read_exact_content() {
        let dir = TempDir::new().unwrap();
        let persistence = persistence_in(&dir);

        persistence.write_state(r#"{"threads":{}}"#).await.unwrap();
        assert_eq!(
            persistence.read_state().await.unwrap().as_deref(),
            Some(r#"{"threads":{}}"#)
        );
    }

    #[tokio::test]
    async fn test_invalid_json_is_rejected_and_prior_state_kept() {
        let dir = TempDir::new().unwrap();
        let persistence = persistence_in(&dir);
        persistence.write_state(r#"{"threads":{}}"#).await.unwrap();

        let err = persistence.write_state("not json").await.unwrap_err();
        assert!(matches!(err, StateError::InvalidJson(_)));

        assert_eq!(
            persistence.read_state().await.unwrap().as_deref(),
            Some(r#"{"threads":{}}"#)
        );
        assert!(!persistence.temp_path().exists());
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let persistence = persistence_in(&dir);

        assert!(persistence.read_state().await.unwrap().is_none());
        assert!(!persistence.state_exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let persistence = FileStatePersistence::new(dir.path().join("workflow-state.json"));
        tokio::fs::write(persistence.path(), "{\"threads\": {").await.unwrap();

        assert!(persistence.read_state().await.unwrap().is_none());
        // Still a regular file, just not usable
        assert!(persistence.state_exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_non_utf8_file_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let persistence = FileStatePersistence::new(dir.path().join("workflow-state.json"));
        tokio::fs::write(persistence.path(), [0xff, 0xfe, 0x00]).await.unwrap();

        assert!(persistence.read_state().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_temp_file_does_not_affect_canonical_file() {
        let dir = TempDir::new().unwrap();
        let persistence = FileStatePersistence::new(dir.path().join("workflow-state.json"));
        persistence.write_state(r#"{"threads":{"a":{}}}"#).await.unwrap();

        // A writer that died after writing the temp file but before the rename
        tokio::fs::write(persistence.temp_path(), r#"{"threads":{"b":{}}}"#)
            .await
            .unwrap();

        assert_eq!(
            persistence.read_state().await.unwrap().as_deref(),
            Some(r#"{"threads":{"a":{}}}"#)
        );

        // The next write replaces the leftover temp file
        persistence.write_state(r#"{"threads":{"c":{}}}"#).await.unwrap();
        assert_eq!(
            persistence.read_state().await.unwrap().as_deref(),
            Some(r#"{"threads":{"c":{}}}"#)
        );
        assert!(!persistence.temp_path().exists());
    }

    #[tokio::test]
    async fn test_directory_is_not_state() {
        let dir = TempDir::new().unwrap();
        let persistence = FileStatePersistence::new(dir.path());

        assert!(!persistence.state_exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_state_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let persistence = persistence_in(&dir);
        persistence.write_state("{}").await.unwrap();
        assert!(persistence.state_exists().await.unwrap());

        persistence.clear_state().await.unwrap();
        assert!(!persistence.state_exists().await.unwrap());
        persistence.clear_state().await.unwrap();
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let persistence = FileStatePersistence::new("/var/state/workflow-state.json");
        assert_eq!(
            persistence.temp_path(),
            PathBuf::from("/var/state/workflow-state.json.tmp")
        );
    }
}
