//! SQLite-backed state persistence
//!
//! Stores the exported checkpoint document as one row per workflow key in the
//! `workflow_state` table. Each write is an upsert inside a transaction, so readers see either
//! the previous document or the new one.

use crate::error::{Result, StateError};
use crate::persistence::{validate_json, StatePersistence};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Row key used when a deployment only has one workflow
pub const DEFAULT_STATE_KEY: &str = "default";

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS workflow_state (
        key TEXT PRIMARY KEY NOT NULL,
        state TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
"#;

/// Workflow state stored in a SQLite database
#[derive(Debug, Clone)]
pub struct SqliteStatePersistence {
    pool: SqlitePool,
    key: String,
}

impl SqliteStatePersistence {
    /// Open (creating if needed) the database at `database_path`
    pub async fn connect(database_path: impl AsRef<Path>, key: impl Into<String>) -> Result<Self> {
        let path = database_path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StateError::io(parent, e))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        info!(path = %path.display(), "Workflow state database connection established");
        Self::initialize(pool, key.into()).await
    }

    /// Private in-memory database, mostly for tests
    pub async fn in_memory(key: impl Into<String>) -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // Every connection to :memory: is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Self::initialize(pool, key.into()).await
    }

    async fn initialize(pool: SqlitePool, key: String) -> Result<Self> {
        if key.is_empty() {
            return Err(StateError::Config("state key must not be empty".to_string()));
        }
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        Ok(Self { pool, key })
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl StatePersistence for SqliteStatePersistence {
    async fn write_state(&self, serialized: &str) -> Result<()> {
        validate_json(serialized)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO workflow_state (key, state, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                state = excluded.state,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&self.key)
        .bind(serialized)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!(key = %self.key, bytes = serialized.len(), "Workflow state written");
        Ok(())
    }

    async fn read_state(&self) -> Result<Option<String>> {
        let state: Option<String> =
            sqlx::query_scalar::<_, String>("SELECT state FROM workflow_state WHERE key = ?1")
                .bind(&self.key)
                .fetch_optional(&self.pool)
                .await?;

        match state {
            Some(content) if validate_json(&content).is_err() => {
                warn!(key = %self.key, "Persisted workflow state is corrupt, ignoring it");
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn state_exists(&self) -> Result<bool> {
        let count: i64 = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM workflow_state WHERE key = ?1")
            .bind(&self.key)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn clear_state(&self) -> Result<()> {
        sqlx::query("DELETE FROM workflow_state WHERE key = ?1")
            .bind(&self.key)
            .execute(&self.pool)
            .await?;
        info!(key = %self.key, "Workflow state cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let persistence = SqliteStatePersistence::in_memory(DEFAULT_STATE_KEY).await.unwrap();

        assert!(persistence.read_state().await.unwrap().is_none());
        persistence.write_state(r#"{"threads":{}}"#).await.unwrap();
        assert_eq!(
            persistence.read_state().await.unwrap().as_deref(),
            Some(r#"{"threads":{}}"#)
        );
        assert!(persistence.state_exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_replaces_previous_state() {
        let persistence = SqliteStatePersistence::in_memory(DEFAULT_STATE_KEY).await.unwrap();

        persistence.write_state(r#"{"n":1}"#).await.unwrap();
        persistence.write_state(r#"{"n":2}"#).await.unwrap();

        assert_eq!(persistence.read_state().await.unwrap().as_deref(), Some(r#"{"n":2}"#));
    }

    #[tokio::test]
    async fn test_invalid_json_keeps_prior_state() {
        let persistence = SqliteStatePersistence::in_memory(DEFAULT_STATE_KEY).await.unwrap();
        persistence.write_state(r#"{"threads":{}}"#).await.unwrap();

        assert!(matches!(
            persistence.write_state("not json").await,
            Err(StateError::InvalidJson(_))
        ));
        assert_eq!(
            persistence.read_state().await.unwrap().as_deref(),
            Some(r#"{"threads":{}}"#)
        );
    }

    #[tokio::test]
    async fn test_corrupt_row_reads_as_none() {
        let persistence = SqliteStatePersistence::in_memory(DEFAULT_STATE_KEY).await.unwrap();
        sqlx::query("INSERT INTO workflow_state (key, state, updated_at) VALUES (?1, ?2, ?3)")
            .bind(DEFAULT_STATE_KEY)
            .bind("{broken")
            .bind(Utc::now().to_rfc3339())
            .execute(&persistence.pool)
            .await
            .unwrap();

        assert!(persistence.read_state().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keys_are_isolated_and_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("workflow-state.db");
        let first = SqliteStatePersistence::connect(&path, "first").await.unwrap();
        let second = SqliteStatePersistence::connect(&path, "second").await.unwrap();

        first.write_state(r#"{"owner":"first"}"#).await.unwrap();
        assert!(!second.state_exists().await.unwrap());

        first.clear_state().await.unwrap();
        first.clear_state().await.unwrap();
        assert!(!first.state_exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_key_is_rejected() {
        let result = SqliteStatePersistence::in_memory("").await;
        assert!(matches!(result, Err(StateError::Config(_))));
    }
}
