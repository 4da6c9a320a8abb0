//! # workflow-graph - State Graphs with Suspend Points
//!
//! A small superstep (Pregel-style) runtime for JSON-state workflows that can **pause in the
//! middle of a node** and resume later, possibly in another process. All progress lives in a
//! [`CheckpointSaver`](workflow_checkpoint::CheckpointSaver), so a compiled graph itself is
//! stateless between calls.
//!
//! ## Core Concepts
//!
//! - [`StateGraph`] - builder: nodes, direct and conditional edges, `START` / `END`
//! - [`CompiledGraph`] - validated graph bound to a checkpointer
//! - [`NodeContext::interrupt`] - pause until a value is supplied
//! - [`GraphInput::Start`] / [`Command::Resume`] - start a run or answer an interrupt
//! - [`StateSnapshot`] - what `get_state` reports: values, `next` nodes, tasks and their
//!   pending interrupts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use workflow_graph::{Command, GraphInput, InvokeOutcome, StateGraph, END};
//! use workflow_checkpoint::{CheckpointConfig, InMemoryCheckpointSaver};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut graph = StateGraph::new();
//!     graph
//!         .add_node("ask", |_state, mut ctx| {
//!             Box::pin(async move {
//!                 let platform = ctx.interrupt(json!({"question": "iOS or Android?"}))?;
//!                 Ok(json!({"platform": platform}))
//!             })
//!         })
//!         .set_entry_point("ask")
//!         .add_edge("ask", END);
//!
//!     let compiled = graph.compile(Arc::new(InMemoryCheckpointSaver::new()))?;
//!     let config = CheckpointConfig::for_thread("thread-1");
//!
//!     // Pauses at the interrupt
//!     let outcome = compiled.invoke(GraphInput::start(json!({})), &config).await?;
//!     assert!(outcome.is_interrupted());
//!
//!     // Answer it
//!     let outcome = compiled.invoke(Command::resume(json!("iOS")), &config).await?;
//!     assert_eq!(outcome, InvokeOutcome::Completed(json!({"platform": "iOS"})));
//!     Ok(())
//! }
//! ```
//!
//! ## Execution Model
//!
//! ```text
//! START ─► superstep 0 ─► superstep 1 ─► ... ─► no tasks left (Completed)
//!               │
//!               └─ a node interrupts: its payload is stored as a pending write on the
//!                  current checkpoint, finished siblings keep their writes, invoke returns
//!                  Interrupted. Resume re-runs only the interrupted node.
//! ```

pub mod command;
pub mod compiled;
pub mod error;
pub mod graph;
pub mod interrupt;
mod pregel;

pub use command::{Command, GraphInput};
pub use compiled::{
    CompiledGraph, InvokeOutcome, PregelTask, StateSnapshot, StateSnapshotStream,
    DEFAULT_RECURSION_LIMIT,
};
pub use error::{GraphError, Result};
pub use graph::{Edge, NodeExecutor, NodeFuture, NodeId, RouterFn, StateGraph, END, START};
pub use interrupt::{Interrupt, NodeContext, INTERRUPT, NO_WRITES, RESUME};
