//! Typed view of the mobile workflow's graph state

use super::tools::Platform;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use workflow_graph::{GraphError, Result};

/// Maximum number of build attempts before the workflow fails
pub const MAX_BUILD_ATTEMPTS: u32 = 3;

/// Fields nodes read from the merged graph state; unknown keys are ignored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MobileWorkflowState {
    pub user_input: Option<Value>,
    pub valid_environment: Option<bool>,
    pub platform: Option<Platform>,
    pub project_name: Option<String>,
    pub package_name: Option<String>,
    pub organization: Option<String>,
    pub template_name: Option<String>,
    pub project_path: Option<String>,
    pub build_attempts: u32,
    pub build_successful: Option<bool>,
    pub build_errors: Vec<String>,
    pub deployment_complete: Option<bool>,
    pub workflow_complete: bool,
    pub workflow_failed: bool,
    pub workflow_fatal_error_messages: Vec<String>,
}

impl MobileWorkflowState {
    pub fn from_value(state: Value) -> Result<Self> {
        Ok(serde_json::from_value(state)?)
    }

    /// For routers, which cannot fail: unreadable state reads as empty
    pub fn deserialize_lossy(state: &Value) -> Self {
        Self::deserialize(state).unwrap_or_default()
    }

    /// Whether `build` has run and can be retried
    pub fn can_retry_build(&self) -> bool {
        self.build_successful == Some(false) && self.build_attempts < MAX_BUILD_ATTEMPTS
    }
}

/// Decode a tool result the caller reported back, accepting it either as JSON or as a string
/// holding JSON
pub fn parse_tool_result<T: DeserializeOwned>(node: &str, result: Value) -> Result<T> {
    let parsed = match result {
        Value::String(text) => serde_json::from_str(&text),
        other => serde_json::from_value(other),
    };
    parsed.map_err(|e| GraphError::node_execution(node, format!("unexpected tool result: {e}")))
}

/// A state field an earlier node should have set
pub fn require<T>(node: &str, field: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| GraphError::node_execution(node, format!("`{field}` is not set")))
}
