//! # workflow-orchestrator - Interrupt/Resume Workflow Driver
//!
//! Advances a multi-step workflow by exactly one step per call. Each step either ends with an
//! interrupt naming the next tool the caller must invoke, or completes the workflow.
//!
//! ## Protocol
//!
//! 1. The caller sends `userInput` and, after the first call, the `workflowStateData` it was
//!    given (`{"thread_id": "..."}`).
//! 2. A missing or unusable thread id starts a new thread `mobile-<millis>-<suffix>`.
//! 3. If the thread is paused on an interrupt, `userInput` resumes it; otherwise a new run
//!    starts with `{"userInput": ...}` as its state.
//! 4. The returned prompt names the next tool, its input schema and values, and tells the caller
//!    to call back with the tool's result and the same thread id.
//!
//! ## Example
//!
//! ```rust,no_run
//! use serde_json::json;
//! use workflow_orchestrator::{orchestrator_for_config, OrchestratorInput, WorkflowDefinition};
//! use workflow_graph::{StateGraph, END};
//! use workflow_state::WorkflowConfig;
//!
//! struct Hello;
//!
//! impl WorkflowDefinition for Hello {
//!     fn orchestrator_tool_name(&self) -> &str {
//!         "hello-orchestrator"
//!     }
//!
//!     fn build_graph(&self) -> workflow_graph::Result<StateGraph> {
//!         let mut graph = StateGraph::new();
//!         graph
//!             .add_node("hello", |_state, _ctx| Box::pin(async move { Ok(json!({"said": "hello"})) }))
//!             .set_entry_point("hello")
//!             .add_edge("hello", END);
//!         Ok(graph)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = orchestrator_for_config(&WorkflowConfig::from_env()?, Hello).await?;
//!     let output = orchestrator.orchestrate(OrchestratorInput::new(json!("hi"))).await?;
//!     println!("{}", output.orchestration_instructions_prompt);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod factory;
pub mod orchestrator;
pub mod prompt;
pub mod thread;
pub mod tool_call;

pub use error::{OrchestratorError, Result};
pub use factory::orchestrator_for_config;
pub use orchestrator::{
    Orchestrator, OrchestratorInput, OrchestratorOutput, WorkflowDefinition, WorkflowOrchestrator,
};
pub use prompt::{build_orchestration_prompt, completion_message};
pub use thread::{generate_thread_id, resolve_thread_id, ResolvedThread, WorkflowStateData, THREAD_ID_PREFIX};
pub use tool_call::NextToolCall;
