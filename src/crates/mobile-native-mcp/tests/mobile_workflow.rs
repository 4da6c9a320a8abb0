//! Walks the mobile workflow through the orchestrator, restarting it between every call

use mobile_native_mcp::workflow::tools::*;
use mobile_native_mcp::MobileNativeWorkflow;
use serde_json::{json, Value};
use tempfile::TempDir;
use workflow_orchestrator::{Orchestrator, OrchestratorInput, OrchestratorOutput, WorkflowOrchestrator};
use workflow_state::{DurableStateManager, WorkflowConfig, WorkflowEnvironment};

struct Session {
    dir: TempDir,
    thread_id: Option<String>,
}

impl Session {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            thread_id: None,
        }
    }

    /// One call against a freshly constructed orchestrator, as after a server restart
    async fn call(&mut self, user_input: Value) -> OrchestratorOutput {
        let config = WorkflowConfig::new(WorkflowEnvironment::Production).with_project_path(self.dir.path());
        let orchestrator = Orchestrator::new(DurableStateManager::from_config(&config).unwrap(), MobileNativeWorkflow);

        let mut input = OrchestratorInput::new(user_input);
        if let Some(thread_id) = &self.thread_id {
            input = input.for_thread(thread_id.clone());
        }

        let output = orchestrator.orchestrate(input).await.unwrap();
        if self.thread_id.is_none() {
            self.thread_id = Some(thread_id_from(&output.orchestration_instructions_prompt));
        }
        output
    }
}

fn thread_id_from(prompt: &str) -> String {
    let marker = "\"thread_id\": \"";
    let start = prompt.find(marker).unwrap() + marker.len();
    let end = prompt[start..].find('"').unwrap() + start;
    prompt[start..end].to_string()
}

fn asks_for(output: &OrchestratorOutput, tool: &str) -> bool {
    !output.is_complete
        && output
            .orchestration_instructions_prompt
            .contains(&format!("Invoke the `{}` tool next.", tool))
}

async fn through_generation(session: &mut Session) -> OrchestratorOutput {
    let output = session.call(json!("Create an iOS app called Acme")).await;
    assert!(asks_for(&output, ENVIRONMENT_VALIDATION_TOOL));

    let output = session.call(json!({"valid": true})).await;
    assert!(asks_for(&output, PROJECT_PROPERTIES_TOOL));
    assert!(output.orchestration_instructions_prompt.contains("Create an iOS app called Acme"));

    let output = session
        .call(json!({
            "platform": "iOS",
            "projectName": "Acme",
            "packageName": "com.acme.app",
            "organization": "Acme Inc"
        }))
        .await;
    assert!(asks_for(&output, TEMPLATE_DISCOVERY_TOOL));

    let output = session.call(json!({"templateName": "iOSNativeSwiftTemplate"})).await;
    assert!(asks_for(&output, PROJECT_GENERATION_TOOL));
    assert!(output.orchestration_instructions_prompt.contains("\"templateName\": \"iOSNativeSwiftTemplate\""));

    let output = session.call(json!({"projectPath": "/work/Acme"})).await;
    assert!(asks_for(&output, BUILD_TOOL));
    assert!(output.orchestration_instructions_prompt.contains("\"attempt\": 1"));
    output
}

#[tokio::test]
async fn test_happy_path_with_one_build_retry() {
    let mut session = Session::new();
    through_generation(&mut session).await;

    let output = session
        .call(json!({"buildSuccessful": false, "error": "missing signing team"}))
        .await;
    assert!(asks_for(&output, BUILD_TOOL));
    assert!(output.orchestration_instructions_prompt.contains("\"attempt\": 2"));

    // Tool results may arrive as stringified JSON
    let output = session.call(json!("{\"buildSuccessful\": true}")).await;
    assert!(asks_for(&output, DEPLOYMENT_TOOL));

    let output = session.call(json!({})).await;
    assert!(output.is_complete);
    assert!(output.orchestration_instructions_prompt.contains("/work/Acme"));
}

#[tokio::test]
async fn test_build_gives_up_after_three_attempts() {
    let mut session = Session::new();
    through_generation(&mut session).await;

    let mut output = session.call(json!({"buildSuccessful": false, "error": "e1"})).await;
    assert!(output.orchestration_instructions_prompt.contains("\"attempt\": 2"));
    output = session.call(json!({"buildSuccessful": false, "error": "e2"})).await;
    assert!(output.orchestration_instructions_prompt.contains("\"attempt\": 3"));
    output = session.call(json!({"buildSuccessful": false, "error": "e3"})).await;

    assert!(output.is_complete);
    let message = &output.orchestration_instructions_prompt;
    assert!(message.contains("Build failed after 3 attempts"));
    assert!(message.contains("Attempt 3: e3"));
}

#[tokio::test]
async fn test_invalid_environment_ends_workflow() {
    let mut session = Session::new();
    session.call(json!("Create an Android app")).await;

    let output = session
        .call(json!({"valid": false, "missingVariables": ["CONNECTED_APP_CONSUMER_KEY"]}))
        .await;

    assert!(output.is_complete);
    assert!(output
        .orchestration_instructions_prompt
        .contains("Missing required environment variables: CONNECTED_APP_CONSUMER_KEY"));
}

#[tokio::test]
async fn test_malformed_tool_result_is_an_error() {
    let mut session = Session::new();
    session.call(json!("Create an app")).await;

    let config = WorkflowConfig::new(WorkflowEnvironment::Production).with_project_path(session.dir.path());
    let orchestrator = Orchestrator::new(DurableStateManager::from_config(&config).unwrap(), MobileNativeWorkflow);
    let err = orchestrator
        .orchestrate(OrchestratorInput::new(json!({"unexpected": true})).for_thread(session.thread_id.clone().unwrap()))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("environment_validation"));

    // The failed step was not saved, so a corrected result still resumes the workflow
    let output = session.call(json!({"valid": true})).await;
    assert!(asks_for(&output, PROJECT_PROPERTIES_TOOL));
}
