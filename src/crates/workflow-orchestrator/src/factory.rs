//! Startup selection of the state strategy

use crate::error::Result;
use crate::orchestrator::{Orchestrator, WorkflowDefinition, WorkflowOrchestrator};
use std::sync::Arc;
use tracing::info;
use workflow_state::{
    DurableStateManager, EphemeralStateManager, StateBackend, WorkflowConfig, WorkflowEnvironment,
};

/// Build the orchestrator for `config`: in-memory state under `test`, the configured durable
/// backend under `production`
pub async fn orchestrator_for_config<W>(
    config: &WorkflowConfig,
    workflow: W,
) -> Result<Arc<dyn WorkflowOrchestrator>>
where
    W: WorkflowDefinition + 'static,
{
    config.validate()?;

    let orchestrator: Arc<dyn WorkflowOrchestrator> = match (config.environment, config.backend) {
        (WorkflowEnvironment::Test, _) => {
            info!("Using ephemeral workflow state");
            Arc::new(Orchestrator::new(EphemeralStateManager::new(), workflow))
        }
        (WorkflowEnvironment::Production, StateBackend::File) => {
            let manager = DurableStateManager::from_config(config)?;
            info!(path = %manager.persistence().path().display(), "Using file workflow state");
            Arc::new(Orchestrator::new(manager, workflow))
        }
        (WorkflowEnvironment::Production, StateBackend::Sqlite) => {
            let manager = DurableStateManager::sqlite_from_config(config).await?;
            info!(path = %config.database_path()?.display(), "Using SQLite workflow state");
            Arc::new(Orchestrator::new(manager, workflow))
        }
    };

    Ok(orchestrator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use workflow_graph::{StateGraph, END};

    struct Noop;

    impl WorkflowDefinition for Noop {
        fn orchestrator_tool_name(&self) -> &str {
            "noop-orchestrator"
        }

        fn build_graph(&self) -> workflow_graph::Result<StateGraph> {
            let mut graph = StateGraph::new();
            graph
                .add_node("done", |_state, _ctx| Box::pin(async { Ok(json!({"done": true})) }))
                .set_entry_point("done")
                .add_edge("done", END);
            Ok(graph)
        }
    }

    #[tokio::test]
    async fn test_environment_selects_strategy() {
        let dir = TempDir::new().unwrap();

        let test = orchestrator_for_config(&WorkflowConfig::new(WorkflowEnvironment::Test), Noop)
            .await
            .unwrap();
        assert_eq!(test.environment(), WorkflowEnvironment::Test);

        let config = WorkflowConfig::new(WorkflowEnvironment::Production).with_project_path(dir.path());
        let production = orchestrator_for_config(&config, Noop).await.unwrap();
        assert_eq!(production.environment(), WorkflowEnvironment::Production);

        let sqlite = orchestrator_for_config(&config.clone().with_backend(StateBackend::Sqlite), Noop)
            .await
            .unwrap();
        assert_eq!(sqlite.environment(), WorkflowEnvironment::Production);
        assert!(config.database_path().unwrap().exists());
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = WorkflowConfig::new(WorkflowEnvironment::Production).with_state_file_name("../escape.json");
        assert!(orchestrator_for_config(&config, Noop).await.is_err());
    }
}
