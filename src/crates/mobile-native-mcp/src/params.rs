//! Tool parameter and result types

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use workflow_orchestrator::OrchestratorInput;

/// Parameters for the project manager (orchestrator) tool
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectManagerParams {
    /// The user's request on the first call; afterwards, the complete result of the tool the
    /// previous response asked you to invoke
    #[serde(default)]
    pub user_input: Option<Value>,

    /// The `workflowStateData` object from the previous response, passed back unchanged. Omit it
    /// to start a new workflow.
    #[serde(default)]
    pub workflow_state_data: Option<Value>,
}

impl From<ProjectManagerParams> for OrchestratorInput {
    fn from(params: ProjectManagerParams) -> Self {
        Self {
            user_input: params.user_input,
            workflow_state_data: params.workflow_state_data,
        }
    }
}

/// Result of the reset tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetWorkflowOutput {
    pub state_existed: bool,
    pub message: String,
}
