//! Command-line arguments

use clap::Parser;
use std::path::PathBuf;
use workflow_state::{StateBackend, WorkflowConfig, WorkflowEnvironment};

/// Flags override the `WORKFLOW_*` environment variables read by [`WorkflowConfig::from_env`]
#[derive(Debug, Parser)]
#[command(name = "mobile-native-mcp")]
#[command(about = "MCP server that walks an agent through creating a native mobile app", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// production keeps workflow state on disk, test keeps it in memory [env: WORKFLOW_ENVIRONMENT]
    #[arg(long)]
    pub environment: Option<WorkflowEnvironment>,

    /// Project whose .mobile-native directory holds the state (default: home directory)
    /// [env: WORKFLOW_PROJECT_PATH]
    #[arg(long)]
    pub project_path: Option<PathBuf>,

    /// File name of the JSON state file [env: WORKFLOW_STATE_FILE]
    #[arg(long)]
    pub state_file: Option<String>,

    /// Durable storage backend: file or sqlite [env: WORKFLOW_STATE_BACKEND]
    #[arg(long)]
    pub backend: Option<StateBackend>,
}

impl Cli {
    /// Environment configuration with any flags applied on top
    pub fn into_config(self) -> workflow_state::Result<WorkflowConfig> {
        self.apply(WorkflowConfig::from_env()?)
    }

    fn apply(self, mut config: WorkflowConfig) -> workflow_state::Result<WorkflowConfig> {
        if let Some(environment) = self.environment {
            config.environment = environment;
        }
        if let Some(path) = self.project_path {
            config = config.with_project_path(path);
        }
        if let Some(name) = self.state_file {
            config = config.with_state_file_name(name);
        }
        if let Some(backend) = self.backend {
            config = config.with_backend(backend);
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_build_config() {
        let cli = Cli::try_parse_from([
            "mobile-native-mcp",
            "--environment",
            "test",
            "--project-path",
            "/work/app",
            "--state-file",
            "custom.json",
            "--backend",
            "sqlite",
        ])
        .unwrap();

        let config = cli.apply(WorkflowConfig::default()).unwrap();
        assert_eq!(config.environment, WorkflowEnvironment::Test);
        assert_eq!(config.project_path, Some(PathBuf::from("/work/app")));
        assert_eq!(config.state_file_name, "custom.json");
        assert_eq!(config.backend, StateBackend::Sqlite);
    }

    #[test]
    fn test_unset_flags_keep_environment_config() {
        let cli = Cli::try_parse_from(["mobile-native-mcp"]).unwrap();
        let base = WorkflowConfig::new(WorkflowEnvironment::Test)
            .with_project_path("/work/base")
            .with_backend(StateBackend::Sqlite);

        assert_eq!(cli.apply(base.clone()).unwrap(), base);
    }

    #[test]
    fn test_invalid_state_file_flag_is_rejected() {
        let cli = Cli::try_parse_from(["mobile-native-mcp", "--state-file", "../escape.json"]).unwrap();
        assert!(cli.apply(WorkflowConfig::default()).is_err());
    }

    #[test]
    fn test_unknown_environment_is_rejected() {
        let result = Cli::try_parse_from(["mobile-native-mcp", "--environment", "staging"]);
        assert!(result.is_err());
    }
}
