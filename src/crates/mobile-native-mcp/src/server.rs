//! MCP server exposing the mobile workflow orchestrator

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError,
};
use std::sync::Arc;
use tracing::error;
use workflow_orchestrator::{orchestrator_for_config, WorkflowOrchestrator};
use workflow_state::{WorkflowConfig, WorkflowEnvironment};

use crate::params::{ProjectManagerParams, ResetWorkflowOutput};
use crate::workflow::MobileNativeWorkflow;

#[derive(Clone)]
pub struct MobileNativeMcpServer {
    orchestrator: Arc<dyn WorkflowOrchestrator>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl MobileNativeMcpServer {
    pub fn new(orchestrator: Arc<dyn WorkflowOrchestrator>) -> Self {
        Self {
            orchestrator,
            tool_router: Self::tool_router(),
        }
    }

    /// Server driving [`MobileNativeWorkflow`] with the state strategy `config` selects
    pub async fn from_config(config: &WorkflowConfig) -> workflow_orchestrator::Result<Self> {
        let orchestrator = orchestrator_for_config(config, MobileNativeWorkflow).await?;
        Ok(Self::new(orchestrator))
    }

    pub fn environment(&self) -> WorkflowEnvironment {
        self.orchestrator.environment()
    }

    #[tool(
        name = "sfmobile-native-project-manager",
        description = "Orchestrates creating a native iOS or Android app end to end. Call it with the user's request to start; each response names the next tool to invoke and how to call this tool back with that tool's result and the unchanged workflowStateData."
    )]
    async fn project_manager(
        &self,
        Parameters(params): Parameters<ProjectManagerParams>,
    ) -> Result<CallToolResult, McpError> {
        let json = self.run_project_manager(params).await?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(
        name = "sfmobile-native-reset-workflow",
        description = "Discard all saved mobile workflow state so the next project manager call starts fresh."
    )]
    async fn reset_workflow(&self) -> Result<CallToolResult, McpError> {
        let json = self.run_reset_workflow().await?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}

impl MobileNativeMcpServer {
    /// Advance the workflow one step; returns the `OrchestratorOutput` as JSON
    pub async fn run_project_manager(&self, params: ProjectManagerParams) -> Result<String, McpError> {
        let output = self.orchestrator.orchestrate(params.into()).await.map_err(|e| {
            error!(error = %e, "Orchestration failed");
            McpError::internal_error(e.to_string(), None)
        })?;

        serde_json::to_string_pretty(&output).map_err(|e| McpError::internal_error(e.to_string(), None))
    }

    pub async fn run_reset_workflow(&self) -> Result<String, McpError> {
        let state_existed = self.orchestrator.reset_state().await.map_err(|e| {
            error!(error = %e, "Workflow reset failed");
            McpError::internal_error(e.to_string(), None)
        })?;

        let message = if state_existed {
            "Saved workflow state was removed."
        } else {
            "There was no saved workflow state."
        };
        let output = ResetWorkflowOutput {
            state_existed,
            message: message.to_string(),
        };

        serde_json::to_string_pretty(&output).map_err(|e| McpError::internal_error(e.to_string(), None))
    }
}

#[tool_handler]
impl rmcp::ServerHandler for MobileNativeMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Mobile Native MCP Server - guides an agent through creating, building and \
                 deploying a native mobile app. Start with sfmobile-native-project-manager and \
                 follow the instructions in each response."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
