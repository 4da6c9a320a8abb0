//! The mobile native app workflow
//!
//! ```text
//! environment_validation ─► project_properties ─► template_discovery ─► project_generation
//!          │                                                                    │
//!          └──invalid──► failure ◄──3 failed attempts── build ◄─────────────────┘
//!                                                        │ ▲
//!                                                        │ └─retry─┘
//!                                                        └─ok─► deployment ─► completion
//! ```

pub mod nodes;
pub mod state;
pub mod tools;

use nodes::*;
use serde_json::Value;
use state::MobileWorkflowState;
use workflow_graph::{StateGraph, END};
use workflow_orchestrator::{completion_message, WorkflowDefinition};

/// Name of the orchestrator tool that drives this workflow
pub const ORCHESTRATOR_TOOL: &str = "sfmobile-native-project-manager";

#[derive(Debug, Clone, Copy, Default)]
pub struct MobileNativeWorkflow;

impl WorkflowDefinition for MobileNativeWorkflow {
    fn orchestrator_tool_name(&self) -> &str {
        ORCHESTRATOR_TOOL
    }

    fn build_graph(&self) -> workflow_graph::Result<StateGraph> {
        let mut graph = StateGraph::new();
        graph
            .add_node(ENVIRONMENT_VALIDATION, environment_validation)
            .add_node(PROJECT_PROPERTIES, project_properties)
            .add_node(TEMPLATE_DISCOVERY, template_discovery)
            .add_node(PROJECT_GENERATION, project_generation)
            .add_node(BUILD, build)
            .add_node(DEPLOYMENT, deployment)
            .add_node(COMPLETION, completion)
            .add_node(FAILURE, failure)
            .set_entry_point(ENVIRONMENT_VALIDATION)
            .add_conditional_edges(
                ENVIRONMENT_VALIDATION,
                after_environment_validation,
                [(PROJECT_PROPERTIES, PROJECT_PROPERTIES), (FAILURE, FAILURE)],
            )
            .add_edge(PROJECT_PROPERTIES, TEMPLATE_DISCOVERY)
            .add_edge(TEMPLATE_DISCOVERY, PROJECT_GENERATION)
            .add_edge(PROJECT_GENERATION, BUILD)
            .add_conditional_edges(
                BUILD,
                after_build,
                [(DEPLOYMENT, DEPLOYMENT), (BUILD, BUILD), (FAILURE, FAILURE)],
            )
            .add_edge(DEPLOYMENT, COMPLETION)
            .add_edge(COMPLETION, END)
            .add_edge(FAILURE, END);
        Ok(graph)
    }

    fn completion_message(&self, thread_id: &str, final_state: &Value) -> String {
        let state = MobileWorkflowState::deserialize_lossy(final_state);
        if state.workflow_failed {
            return format!(
                "The workflow for thread `{}` stopped without producing an app:\n\n- {}",
                thread_id,
                state.workflow_fatal_error_messages.join("\n- ")
            );
        }

        match state.project_path {
            Some(path) => format!("{} The app was generated at `{}`.", completion_message(thread_id), path),
            None => completion_message(thread_id),
        }
    }
}
