//! Node functions of the mobile workflow
//!
//! External steps pause on a [`NextToolCall`]; the tool's result comes back as the resume value
//! and is merged into the state as a partial update.

use super::state::{parse_tool_result, require, MobileWorkflowState, MAX_BUILD_ATTEMPTS};
use super::tools::*;
use serde_json::{json, Value};
use tracing::{info, warn};
use workflow_graph::{NodeContext, NodeFuture};
use workflow_orchestrator::NextToolCall;

pub const ENVIRONMENT_VALIDATION: &str = "environment_validation";
pub const PROJECT_PROPERTIES: &str = "project_properties";
pub const TEMPLATE_DISCOVERY: &str = "template_discovery";
pub const PROJECT_GENERATION: &str = "project_generation";
pub const BUILD: &str = "build";
pub const DEPLOYMENT: &str = "deployment";
pub const COMPLETION: &str = "completion";
pub const FAILURE: &str = "failure";

pub fn environment_validation(_state: Value, mut ctx: NodeContext) -> NodeFuture {
    Box::pin(async move {
        let call = NextToolCall::for_input(
            ENVIRONMENT_VALIDATION_TOOL,
            "Check that the environment variables required to connect the app to its org are set.",
            &EnvironmentValidationInput {
                required_variables: REQUIRED_ENVIRONMENT_VARIABLES.iter().map(|v| v.to_string()).collect(),
            },
        )?;
        let result: EnvironmentValidationResult =
            parse_tool_result(ENVIRONMENT_VALIDATION, call.interrupt(&mut ctx)?)?;

        if result.valid {
            return Ok(json!({ "validEnvironment": true }));
        }

        warn!(missing = ?result.missing_variables, "Environment validation failed");
        Ok(json!({
            "validEnvironment": false,
            "workflowFatalErrorMessages": [format!(
                "Missing required environment variables: {}",
                result.missing_variables.join(", ")
            )],
        }))
    })
}

pub fn project_properties(state: Value, mut ctx: NodeContext) -> NodeFuture {
    Box::pin(async move {
        let state = MobileWorkflowState::from_value(state)?;
        let call = NextToolCall::for_input(
            PROJECT_PROPERTIES_TOOL,
            "Determine the platform, project name, package name and organization for the app.",
            &ProjectPropertiesInput {
                user_request: state.user_input.unwrap_or(Value::Null),
            },
        )?;
        let properties: ProjectProperties = parse_tool_result(PROJECT_PROPERTIES, call.interrupt(&mut ctx)?)?;

        info!(platform = %properties.platform, project = %properties.project_name, "Project properties set");
        Ok(serde_json::to_value(properties)?)
    })
}

pub fn template_discovery(state: Value, mut ctx: NodeContext) -> NodeFuture {
    Box::pin(async move {
        let state = MobileWorkflowState::from_value(state)?;
        let platform = require(TEMPLATE_DISCOVERY, "platform", state.platform)?;

        let call = NextToolCall::for_input(
            TEMPLATE_DISCOVERY_TOOL,
            "Find the project template that best matches the requested app.",
            &TemplateDiscoveryInput { platform },
        )?;
        let result: TemplateDiscoveryResult = parse_tool_result(TEMPLATE_DISCOVERY, call.interrupt(&mut ctx)?)?;

        Ok(json!({ "templateName": result.template_name }))
    })
}

pub fn project_generation(state: Value, mut ctx: NodeContext) -> NodeFuture {
    Box::pin(async move {
        let state = MobileWorkflowState::from_value(state)?;
        let input = ProjectGenerationInput {
            template_name: require(PROJECT_GENERATION, "templateName", state.template_name)?,
            project_name: require(PROJECT_GENERATION, "projectName", state.project_name)?,
            package_name: require(PROJECT_GENERATION, "packageName", state.package_name)?,
            organization: require(PROJECT_GENERATION, "organization", state.organization)?,
            platform: require(PROJECT_GENERATION, "platform", state.platform)?,
        };

        let call = NextToolCall::for_input(
            PROJECT_GENERATION_TOOL,
            "Generate the project from the selected template.",
            &input,
        )?;
        let result: ProjectGenerationResult = parse_tool_result(PROJECT_GENERATION, call.interrupt(&mut ctx)?)?;

        Ok(json!({ "projectPath": result.project_path }))
    })
}

pub fn build(state: Value, mut ctx: NodeContext) -> NodeFuture {
    Box::pin(async move {
        let state = MobileWorkflowState::from_value(state)?;
        let attempt = state.build_attempts + 1;
        let input = BuildInput {
            project_path: require(BUILD, "projectPath", state.project_path)?,
            platform: require(BUILD, "platform", state.platform)?,
            attempt,
        };

        let call = NextToolCall::for_input(
            BUILD_TOOL,
            "Build the generated project. If a previous attempt failed, fix the reported errors first.",
            &input,
        )?;
        let result: BuildResult = parse_tool_result(BUILD, call.interrupt(&mut ctx)?)?;

        let mut build_errors = state.build_errors;
        if !result.build_successful {
            let message = result.error.unwrap_or_else(|| "build failed".to_string());
            warn!(attempt, max_attempts = MAX_BUILD_ATTEMPTS, error = %message, "Build attempt failed");
            build_errors.push(format!("Attempt {attempt}: {message}"));
        }

        Ok(json!({
            "buildAttempts": attempt,
            "buildSuccessful": result.build_successful,
            "buildErrors": build_errors,
        }))
    })
}

pub fn deployment(state: Value, mut ctx: NodeContext) -> NodeFuture {
    Box::pin(async move {
        let state = MobileWorkflowState::from_value(state)?;
        let input = DeploymentInput {
            project_path: require(DEPLOYMENT, "projectPath", state.project_path)?,
            platform: require(DEPLOYMENT, "platform", state.platform)?,
        };

        let call = NextToolCall::for_input(
            DEPLOYMENT_TOOL,
            "Deploy the built app to a simulator or emulator and launch it.",
            &input,
        )?;
        let result: DeploymentResult = parse_tool_result(DEPLOYMENT, call.interrupt(&mut ctx)?)?;

        Ok(json!({ "deploymentComplete": result.deployment_complete }))
    })
}

pub fn completion(_state: Value, _ctx: NodeContext) -> NodeFuture {
    Box::pin(async move { Ok(json!({ "workflowComplete": true })) })
}

pub fn failure(state: Value, _ctx: NodeContext) -> NodeFuture {
    Box::pin(async move {
        let state = MobileWorkflowState::from_value(state)?;
        let mut messages = state.workflow_fatal_error_messages;
        if state.build_successful == Some(false) {
            messages.push(format!("Build failed after {} attempts", state.build_attempts));
            messages.extend(state.build_errors);
        }

        warn!(messages = ?messages, "Workflow failed");
        Ok(json!({
            "workflowFailed": true,
            "workflowFatalErrorMessages": messages,
        }))
    })
}

/// Route after environment validation
pub fn after_environment_validation(state: &Value) -> String {
    if state["validEnvironment"].as_bool().unwrap_or(false) {
        PROJECT_PROPERTIES.to_string()
    } else {
        FAILURE.to_string()
    }
}

/// Route after a build attempt: deploy, retry, or give up
pub fn after_build(state: &Value) -> String {
    let state = MobileWorkflowState::deserialize_lossy(state);
    if state.build_successful == Some(true) {
        DEPLOYMENT.to_string()
    } else if state.can_retry_build() {
        BUILD.to_string()
    } else {
        FAILURE.to_string()
    }
}
