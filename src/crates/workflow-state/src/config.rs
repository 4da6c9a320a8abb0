//! Workflow environment configuration
//!
//! Loaded from environment variables:
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `WORKFLOW_ENVIRONMENT` | `production` (durable state) or `test` (ephemeral) | `production` |
//! | `WORKFLOW_PROJECT_PATH` | project whose `.mobile-native/` directory holds state | home dir |
//! | `WORKFLOW_STATE_FILE` | state file name inside that directory | `workflow-state.json` |
//! | `WORKFLOW_STATE_BACKEND` | `file` or `sqlite` durable storage | `file` |

use crate::error::{Result, StateError};
use crate::paths::{self, DEFAULT_DATABASE_FILE, DEFAULT_STATE_FILE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const ENVIRONMENT_VAR: &str = "WORKFLOW_ENVIRONMENT";
pub const PROJECT_PATH_VAR: &str = "WORKFLOW_PROJECT_PATH";
pub const STATE_FILE_VAR: &str = "WORKFLOW_STATE_FILE";
pub const STATE_BACKEND_VAR: &str = "WORKFLOW_STATE_BACKEND";

/// Get an environment variable as a string.
pub fn get_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|e| {
        StateError::Config(format!("Environment variable '{}' not found: {}", key, e))
    })
}

/// Get an environment variable and parse it to the specified type.
pub fn get_env_parse<T: FromStr>(key: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    let value = get_env(key)?;
    value.parse::<T>().map_err(|e| {
        StateError::Config(format!(
            "Failed to parse environment variable '{}': {}",
            key, e
        ))
    })
}

/// Get an environment variable with a default value.
pub fn get_env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Which checkpointer backs the workflow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowEnvironment {
    /// State is persisted between invocations
    #[default]
    Production,
    /// In-memory state only; every run starts clean
    Test,
}

impl WorkflowEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowEnvironment::Production => "production",
            WorkflowEnvironment::Test => "test",
        }
    }

    pub fn is_durable(&self) -> bool {
        matches!(self, WorkflowEnvironment::Production)
    }
}

impl fmt::Display for WorkflowEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowEnvironment {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(WorkflowEnvironment::Production),
            "test" => Ok(WorkflowEnvironment::Test),
            other => Err(StateError::Config(format!(
                "unknown workflow environment '{}' (expected 'production' or 'test')",
                other
            ))),
        }
    }
}

/// Storage used by the durable environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    /// One JSON file, replaced atomically
    #[default]
    File,
    /// One row in a SQLite database
    Sqlite,
}

impl fmt::Display for StateBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateBackend::File => f.write_str("file"),
            StateBackend::Sqlite => f.write_str("sqlite"),
        }
    }
}

impl FromStr for StateBackend {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" | "json" => Ok(StateBackend::File),
            "sqlite" => Ok(StateBackend::Sqlite),
            other => Err(StateError::Config(format!(
                "unknown state backend '{}' (expected 'file' or 'sqlite')",
                other
            ))),
        }
    }
}

/// Where and how workflow state is kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub environment: WorkflowEnvironment,
    /// Project workspace; `None` falls back to the home directory
    pub project_path: Option<PathBuf>,
    pub state_file_name: String,
    pub backend: StateBackend,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            environment: WorkflowEnvironment::default(),
            project_path: None,
            state_file_name: DEFAULT_STATE_FILE.to_string(),
            backend: StateBackend::default(),
        }
    }
}

impl WorkflowConfig {
    pub fn new(environment: WorkflowEnvironment) -> Self {
        Self {
            environment,
            ..Self::default()
        }
    }

    pub fn with_project_path(mut self, project_path: impl Into<PathBuf>) -> Self {
        self.project_path = Some(project_path.into());
        self
    }

    pub fn with_state_file_name(mut self, name: impl Into<String>) -> Self {
        self.state_file_name = name.into();
        self
    }

    pub fn with_backend(mut self, backend: StateBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Load from `WORKFLOW_*` environment variables, validating the result
    pub fn from_env() -> Result<Self> {
        let environment = match std::env::var(ENVIRONMENT_VAR) {
            Ok(value) if !value.trim().is_empty() => get_env_parse(ENVIRONMENT_VAR)?,
            _ => WorkflowEnvironment::default(),
        };

        let backend = match std::env::var(STATE_BACKEND_VAR) {
            Ok(value) if !value.trim().is_empty() => get_env_parse(STATE_BACKEND_VAR)?,
            _ => StateBackend::default(),
        };

        let project_path = get_env(PROJECT_PATH_VAR)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let config = Self {
            environment,
            project_path,
            state_file_name: get_env_or(STATE_FILE_VAR, DEFAULT_STATE_FILE),
            backend,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let name = self.state_file_name.as_str();
        if name.is_empty() || name == "." || name == ".." {
            return Err(StateError::Config(format!("invalid state file name '{}'", name)));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(StateError::Config(format!(
                "state file name '{}' must not contain path separators",
                name
            )));
        }
        Ok(())
    }

    /// The well-known state directory for this configuration
    pub fn state_dir(&self) -> Result<PathBuf> {
        paths::well_known_dir(self.project_path.as_deref())
    }

    pub fn state_file_path(&self) -> Result<PathBuf> {
        Ok(self.state_dir()?.join(&self.state_file_name))
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        Ok(self.state_dir()?.join(DEFAULT_DATABASE_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_environment_parsing() {
        assert_eq!("production".parse::<WorkflowEnvironment>().unwrap(), WorkflowEnvironment::Production);
        assert_eq!("TEST".parse::<WorkflowEnvironment>().unwrap(), WorkflowEnvironment::Test);
        assert_eq!(" Prod ".parse::<WorkflowEnvironment>().unwrap(), WorkflowEnvironment::Production);
        assert!("staging".parse::<WorkflowEnvironment>().is_err());
    }

    #[test]
    fn test_environment_serde_is_lowercase() {
        let json = serde_json::to_string(&WorkflowEnvironment::Test).unwrap();
        assert_eq!(json, "\"test\"");
        assert_eq!(WorkflowEnvironment::Production.to_string(), "production");
    }

    #[test]
    fn test_state_paths_under_project() {
        let config = WorkflowConfig::new(WorkflowEnvironment::Production).with_project_path("/work/app");

        assert_eq!(
            config.state_file_path().unwrap(),
            PathBuf::from("/work/app/.mobile-native/workflow-state.json")
        );
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/work/app/.mobile-native/workflow-state.db")
        );
    }

    #[test]
    fn test_validate_rejects_path_like_names() {
        let config = WorkflowConfig::default().with_state_file_name("../escape.json");
        assert!(config.validate().is_err());

        let config = WorkflowConfig::default().with_state_file_name("");
        assert!(config.validate().is_err());

        assert!(WorkflowConfig::default().validate().is_ok());
    }

    // Single test so the variables are not raced by parallel tests in this module
    #[test]
    fn test_from_env() {
        env::set_var(ENVIRONMENT_VAR, "test");
        env::set_var(PROJECT_PATH_VAR, "/work/app");
        env::set_var(STATE_FILE_VAR, "custom.json");
        env::set_var(STATE_BACKEND_VAR, "SQLite");

        let config = WorkflowConfig::from_env().unwrap();
        assert_eq!(config.environment, WorkflowEnvironment::Test);
        assert_eq!(config.project_path, Some(PathBuf::from("/work/app")));
        assert_eq!(config.state_file_name, "custom.json");
        assert_eq!(config.backend, StateBackend::Sqlite);

        env::set_var(ENVIRONMENT_VAR, "staging");
        assert!(WorkflowConfig::from_env().is_err());

        env::remove_var(ENVIRONMENT_VAR);
        env::remove_var(PROJECT_PATH_VAR);
        env::remove_var(STATE_FILE_VAR);
        env::remove_var(STATE_BACKEND_VAR);

        let config = WorkflowConfig::from_env().unwrap();
        assert_eq!(config, WorkflowConfig::default());
    }

    #[test]
    fn test_get_env_or() {
        assert_eq!(get_env_or("WORKFLOW_STATE_NONEXISTENT_VAR", "fallback"), "fallback");
        assert!(get_env("WORKFLOW_STATE_NONEXISTENT_VAR").is_err());
    }
}
