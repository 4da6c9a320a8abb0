//! Graph definition: nodes, edges and the builder API
//!
//! ```text
//!   START ──► environment_validation ──► project_properties ──► ... ──► END
//!                                              │
//!                         conditional edge ────┴──► failure ──► END
//! ```
//!
//! Nodes are async functions `(state, ctx) -> update`. The update is a JSON object whose keys
//! overwrite the corresponding state keys (last value wins); `null` means "no update". Edges
//! decide which nodes run in the next superstep.

use crate::compiled::CompiledGraph;
use crate::error::{GraphError, Result};
use crate::interrupt::NodeContext;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use workflow_checkpoint::CheckpointSaver;

/// Node identifier type
pub type NodeId = String;

/// Virtual node marking where execution begins
pub const START: &str = "__start__";

/// Virtual node marking termination
pub const END: &str = "__end__";

/// Future returned by a node
pub type NodeFuture = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

/// Node executor function type
///
/// ```rust
/// use workflow_graph::{NodeContext, NodeExecutor, NodeFuture};
/// use serde_json::{json, Value};
/// use std::sync::Arc;
///
/// fn project_properties(state: Value, mut ctx: NodeContext) -> NodeFuture {
///     Box::pin(async move {
///         let name = ctx.interrupt(json!({"ask": "project name"}))?;
///         Ok(json!({"projectName": name, "seen": state["userInput"].clone()}))
///     })
/// }
///
/// let executor: NodeExecutor = Arc::new(project_properties);
/// ```
pub type NodeExecutor = Arc<dyn Fn(Value, NodeContext) -> NodeFuture + Send + Sync>;

/// Router for conditional edges: returns a branch key for the given state
pub type RouterFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// Edge type defining transitions between nodes
#[derive(Clone)]
pub enum Edge {
    /// Unconditional edge to a specific node
    Direct(NodeId),

    /// Conditional edge; the router's key is looked up in `branches`, or used as the target
    /// node itself when `branches` is empty
    Conditional {
        router: RouterFn,
        branches: HashMap<String, NodeId>,
    },
}

impl std::fmt::Debug for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Edge::Direct(to) => f.debug_tuple("Direct").field(to).finish(),
            Edge::Conditional { branches, .. } => f
                .debug_struct("Conditional")
                .field("router", &"<function>")
                .field("branches", branches)
                .finish(),
        }
    }
}

/// Builder for a state graph
///
/// # Example
///
/// ```rust
/// use workflow_graph::{StateGraph, END, START};
/// use workflow_checkpoint::InMemoryCheckpointSaver;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let mut graph = StateGraph::new();
/// graph
///     .add_node("greet", |_state, _ctx| Box::pin(async move { Ok(json!({"greeting": "hi"})) }))
///     .add_edge(START, "greet")
///     .add_edge("greet", END);
///
/// let compiled = graph.compile(Arc::new(InMemoryCheckpointSaver::new())).unwrap();
/// assert_eq!(compiled.node_names(), vec!["greet"]);
/// ```
#[derive(Clone, Default)]
pub struct StateGraph {
    pub(crate) nodes: BTreeMap<NodeId, NodeExecutor>,
    pub(crate) edges: HashMap<NodeId, Vec<Edge>>,
}

impl StateGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Adding a node under an existing name replaces it.
    pub fn add_node<F>(&mut self, id: impl Into<NodeId>, executor: F) -> &mut Self
    where
        F: Fn(Value, NodeContext) -> NodeFuture + Send + Sync + 'static,
    {
        self.nodes.insert(id.into(), Arc::new(executor));
        self
    }

    /// Add a direct edge between two nodes
    pub fn add_edge(&mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) -> &mut Self {
        self.edges
            .entry(from.into())
            .or_default()
            .push(Edge::Direct(to.into()));
        self
    }

    /// Add a conditional edge
    ///
    /// `branches` maps router keys to target nodes; pass an empty iterator when the router
    /// returns node names directly.
    pub fn add_conditional_edges<F, I, K, V>(&mut self, from: impl Into<NodeId>, router: F, branches: I) -> &mut Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<NodeId>,
    {
        let branches = branches
            .into_iter()
            .map(|(key, target)| (key.into(), target.into()))
            .collect();

        self.edges.entry(from.into()).or_default().push(Edge::Conditional {
            router: Arc::new(router),
            branches,
        });
        self
    }

    /// Shorthand for `add_edge(START, node)`
    pub fn set_entry_point(&mut self, node: impl Into<NodeId>) -> &mut Self {
        self.add_edge(START, node)
    }

    /// Check the graph structure
    ///
    /// # Errors
    ///
    /// [`GraphError::Validation`] if:
    /// - Nothing is reachable from `START`
    /// - A node uses a reserved name
    /// - Any edge source or target doesn't exist (other than `START` / `END`)
    /// - `END` has outgoing edges
    pub fn validate(&self) -> Result<()> {
        for reserved in [START, END] {
            if self.nodes.contains_key(reserved) {
                return Err(GraphError::Validation(format!("Node name {} is reserved", reserved)));
            }
        }

        if self.edges.get(START).map_or(true, Vec::is_empty) {
            return Err(GraphError::Validation(
                "Graph must have an entry point (an edge from START)".to_string(),
            ));
        }

        let exists = |node: &str, virtual_node: &str| node == virtual_node || self.nodes.contains_key(node);

        for (from, edges) in &self.edges {
            if from == END {
                return Err(GraphError::Validation("END cannot have outgoing edges".to_string()));
            }
            if !exists(from.as_str(), START) {
                return Err(GraphError::Validation(format!("Edge source {} does not exist", from)));
            }

            for edge in edges {
                match edge {
                    Edge::Direct(to) => {
                        if !exists(to.as_str(), END) {
                            return Err(GraphError::Validation(format!("Edge target {} does not exist", to)));
                        }
                    }
                    Edge::Conditional { branches, .. } => {
                        for to in branches.values() {
                            if !exists(to.as_str(), END) {
                                return Err(GraphError::Validation(format!(
                                    "Branch target {} does not exist",
                                    to
                                )));
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Validate and bind the graph to a checkpointer
    pub fn compile(self, checkpointer: Arc<dyn CheckpointSaver>) -> Result<CompiledGraph> {
        self.validate()?;
        Ok(CompiledGraph::new(self, checkpointer))
    }

    /// Nodes to schedule after `from` finished, given the state it produced
    pub(crate) fn route(&self, from: &str, state: &Value) -> Result<Vec<NodeId>> {
        let mut targets = Vec::new();

        for edge in self.edges.get(from).into_iter().flatten() {
            let target = match edge {
                Edge::Direct(to) => to.clone(),
                Edge::Conditional { router, branches } => {
                    let key = router(state);
                    match branches.get(&key) {
                        Some(to) => to.clone(),
                        None if branches.is_empty() && (key == END || self.nodes.contains_key(&key)) => key,
                        None => {
                            return Err(GraphError::node_execution(
                                from,
                                format!("router returned unknown branch '{}'", key),
                            ))
                        }
                    }
                }
            };

            if target != END && !targets.contains(&target) {
                targets.push(target);
            }
        }

        Ok(targets)
    }
}

impl std::fmt::Debug for StateGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateGraph")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn noop(_state: Value, _ctx: NodeContext) -> NodeFuture {
        Box::pin(async move { Ok(Value::Null) })
    }

    #[test]
    fn test_valid_graph() {
        let mut graph = StateGraph::new();
        graph.add_node("a", noop).add_node("b", noop);
        graph.set_entry_point("a").add_edge("a", "b").add_edge("b", END);

        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_missing_entry_point() {
        let mut graph = StateGraph::new();
        graph.add_node("a", noop);

        let err = graph.validate().unwrap_err();
        assert!(matches!(err, GraphError::Validation(msg) if msg.contains("entry point")));
    }

    #[test]
    fn test_unknown_edge_target() {
        let mut graph = StateGraph::new();
        graph.add_node("a", noop).set_entry_point("a").add_edge("a", "missing");

        let err = graph.validate().unwrap_err();
        assert!(matches!(err, GraphError::Validation(msg) if msg.contains("missing")));
    }

    #[test]
    fn test_unknown_branch_target() {
        let mut graph = StateGraph::new();
        graph
            .add_node("a", noop)
            .set_entry_point("a")
            .add_conditional_edges("a", |_| "x".to_string(), [("x", "nowhere")]);

        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_reserved_name() {
        let mut graph = StateGraph::new();
        graph.add_node(END, noop).set_entry_point(END);

        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_route_direct_and_conditional() {
        let mut graph = StateGraph::new();
        graph
            .add_node("build", noop)
            .add_node("deploy", noop)
            .add_node("failure", noop)
            .set_entry_point("build")
            .add_conditional_edges(
                "build",
                |state| {
                    if state["buildSuccessful"] == json!(true) {
                        "ok".to_string()
                    } else {
                        "failed".to_string()
                    }
                },
                [("ok", "deploy"), ("failed", "failure")],
            )
            .add_edge("deploy", END);

        assert_eq!(graph.route(START, &json!({})).unwrap(), vec!["build"]);
        assert_eq!(graph.route("build", &json!({"buildSuccessful": true})).unwrap(), vec!["deploy"]);
        assert_eq!(graph.route("build", &json!({})).unwrap(), vec!["failure"]);
        assert!(graph.route("deploy", &json!({})).unwrap().is_empty());
    }

    #[test]
    fn test_router_returning_node_names() {
        let mut graph = StateGraph::new();
        graph
            .add_node("a", noop)
            .add_node("b", noop)
            .set_entry_point("a")
            .add_conditional_edges("a", |_| "b".to_string(), Vec::<(String, String)>::new());

        assert_eq!(graph.route("a", &json!({})).unwrap(), vec!["b"]);
    }
}
