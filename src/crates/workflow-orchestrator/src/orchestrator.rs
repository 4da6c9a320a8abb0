//! One workflow step per invocation
//!
//! ```text
//!  resolve thread ─► load checkpointer ─► get_state ──interrupted──► Command::Resume(userInput)
//!                                             │                              │
//!                                             └──otherwise──► Start({userInput})
//!                                                                            │
//!              get_state ◄──────────────────────── invoke ◄──────────────────┘
//!                 │
//!                 ├─ next non-empty ─► NextToolCall from the interrupt ─► prompt ─► persist
//!                 └─ next empty ─────► completion message
//! ```

use crate::error::{OrchestratorError, Result};
use crate::prompt::{build_orchestration_prompt, completion_message};
use crate::thread::resolve_thread_id;
use crate::tool_call::NextToolCall;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info};
use workflow_checkpoint::{CheckpointConfig, CheckpointSaver};
use workflow_graph::{
    Command, GraphInput, StateGraph, StateSnapshot, DEFAULT_RECURSION_LIMIT,
};
use workflow_state::{StateManager, WorkflowEnvironment};

/// Input of one orchestrator invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorInput {
    /// Result of the previously requested tool call, or the initial request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_input: Option<Value>,

    /// `{"thread_id": "..."}` exactly as returned by the previous invocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_state_data: Option<Value>,
}

impl OrchestratorInput {
    pub fn new(user_input: Value) -> Self {
        Self {
            user_input: Some(user_input),
            workflow_state_data: None,
        }
    }

    pub fn for_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.workflow_state_data = Some(json!({ "thread_id": thread_id.into() }));
        self
    }
}

/// Result of one orchestrator invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorOutput {
    pub orchestration_instructions_prompt: String,
    pub is_complete: bool,
}

/// A workflow the orchestrator can drive
pub trait WorkflowDefinition: Send + Sync {
    /// Name of the tool that drives this workflow; prompts tell the caller to call it back
    fn orchestrator_tool_name(&self) -> &str;

    /// Build a fresh graph for one invocation
    fn build_graph(&self) -> workflow_graph::Result<StateGraph>;

    fn completion_message(&self, thread_id: &str, _final_state: &Value) -> String {
        completion_message(thread_id)
    }
}

/// Orchestrator chosen once at startup, independent of its state backend
#[async_trait]
pub trait WorkflowOrchestrator: Send + Sync {
    fn environment(&self) -> WorkflowEnvironment;

    async fn orchestrate(&self, input: OrchestratorInput) -> Result<OrchestratorOutput>;

    /// Remove persisted workflow state; returns whether any existed
    async fn reset_state(&self) -> Result<bool>;
}

/// Drives `W` against checkpointers provided by `M`
#[derive(Debug)]
pub struct Orchestrator<M, W> {
    state_manager: M,
    workflow: W,
    recursion_limit: usize,
}

impl<M: StateManager, W: WorkflowDefinition> Orchestrator<M, W> {
    pub fn new(state_manager: M, workflow: W) -> Self {
        Self {
            state_manager,
            workflow,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn state_manager(&self) -> &M {
        &self.state_manager
    }

    pub fn workflow(&self) -> &W {
        &self.workflow
    }

    /// Run the workflow thread named in `input` up to its next pause point
    pub async fn run_step(&self, input: OrchestratorInput) -> Result<OrchestratorOutput> {
        let thread = resolve_thread_id(input.workflow_state_data.as_ref());
        let thread_id = thread.thread_id;
        let config = CheckpointConfig::for_thread(&thread_id);

        let checkpointer = self.state_manager.create_checkpointer().await?;
        let saver: Arc<dyn CheckpointSaver> = checkpointer.clone();
        let graph = self
            .workflow
            .build_graph()?
            .compile(saver)?
            .with_recursion_limit(self.recursion_limit);

        let user_input = input.user_input.unwrap_or(Value::Null);
        let interrupted = graph
            .get_state(&config)
            .await?
            .is_some_and(|snapshot| snapshot.is_interrupted());

        let graph_input = if interrupted {
            info!(thread_id = %thread_id, "Resuming interrupted workflow");
            GraphInput::from(Command::resume(user_input))
        } else {
            info!(thread_id = %thread_id, new_thread = thread.is_new, "Starting workflow");
            GraphInput::start(json!({ "userInput": user_input }))
        };

        graph.invoke(graph_input, &config).await?;

        let snapshot = graph.get_state(&config).await?;
        match snapshot {
            Some(snapshot) if !snapshot.next.is_empty() => {
                let call = next_tool_call(&snapshot, &thread_id)?;
                debug!(thread_id = %thread_id, tool = %call.tool_name, "Workflow paused for tool call");

                let prompt = build_orchestration_prompt(
                    &call,
                    &thread_id,
                    self.workflow.orchestrator_tool_name(),
                );
                self.state_manager.save_checkpointer_state(&*checkpointer).await?;

                Ok(OrchestratorOutput {
                    orchestration_instructions_prompt: prompt,
                    is_complete: false,
                })
            }
            snapshot => {
                info!(thread_id = %thread_id, "Workflow complete");
                let values = snapshot.map(|s| s.values).unwrap_or(Value::Null);
                Ok(OrchestratorOutput {
                    orchestration_instructions_prompt: self.workflow.completion_message(&thread_id, &values),
                    is_complete: true,
                })
            }
        }
    }
}

/// The tool call requested by the first pending interrupt
fn next_tool_call(snapshot: &StateSnapshot, thread_id: &str) -> Result<NextToolCall> {
    let interrupt = snapshot
        .tasks
        .iter()
        .flat_map(|task| task.interrupts.iter())
        .next()
        .ok_or_else(|| {
            error!(thread_id, next = ?snapshot.next, "Workflow paused without an interrupt payload");
            OrchestratorError::MissingInterruptPayload {
                thread_id: thread_id.to_string(),
            }
        })?;

    NextToolCall::from_value(&interrupt.value).map_err(|source| {
        error!(thread_id, error = %source, "Interrupt payload is not a tool call");
        OrchestratorError::InvalidInterruptPayload {
            thread_id: thread_id.to_string(),
            source,
        }
    })
}

#[async_trait]
impl<M, W> WorkflowOrchestrator for Orchestrator<M, W>
where
    M: StateManager,
    W: WorkflowDefinition,
{
    fn environment(&self) -> WorkflowEnvironment {
        self.state_manager.environment()
    }

    async fn orchestrate(&self, input: OrchestratorInput) -> Result<OrchestratorOutput> {
        self.run_step(input).await
    }

    async fn reset_state(&self) -> Result<bool> {
        let existed = self.state_manager.state_exists().await?;
        self.state_manager.clear_state().await?;
        info!(existed, "Workflow state reset");
        Ok(existed)
    }
}
