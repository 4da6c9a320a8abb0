//! Inline interrupts raised from inside nodes
//!
//! A node pauses the graph by calling [`NodeContext::interrupt`] with a payload describing
//! what it needs. The first time through, the call fails with
//! [`GraphError::Interrupt`](crate::GraphError::Interrupt); the node propagates it with `?`, the
//! runtime records the payload as a pending write on the [`INTERRUPT`] channel and the
//! invocation returns. When the thread is resumed with
//! [`Command::Resume`](crate::Command::Resume), the node runs again from the top and the same
//! `interrupt` call now returns the resume value.
//!
//! ```text
//! invoke(Start)            node: ctx.interrupt({"tool": "x"})  ── Err(Interrupt) ──► recorded
//! invoke(Resume(answer))   node: ctx.interrupt({"tool": "x"})  ── Ok(answer)     ──► continues
//! ```
//!
//! A node may interrupt more than once. Interrupts are matched to resume values by position,
//! so nodes must call `interrupt` in a deterministic order.

use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Channel holding a task's pending interrupt
pub const INTERRUPT: &str = "__interrupt__";

/// Channel holding the resume values supplied for a task (JSON array, by interrupt position)
pub const RESUME: &str = "__resume__";

/// Marker write for a task that finished without producing any writes
pub const NO_WRITES: &str = "__no_writes__";

/// A pause requested by a node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interrupt {
    /// Payload describing what the node needs before it can continue
    pub value: Value,

    /// Stable identifier of this interrupt
    pub id: String,

    /// Position of this interrupt among the interrupts raised by the same task
    #[serde(default)]
    pub index: usize,
}

impl Interrupt {
    pub fn new(value: Value, id: impl Into<String>) -> Self {
        Self {
            value,
            id: id.into(),
            index: 0,
        }
    }

    pub(crate) fn for_task(value: Value, task_id: &str, index: usize) -> Self {
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{task_id}:{index}").as_bytes());
        Self {
            value,
            id: id.to_string(),
            index,
        }
    }
}

/// Per-task execution context handed to every node
#[derive(Debug, Clone)]
pub struct NodeContext {
    node: String,
    task_id: String,
    step: i64,
    resume: Vec<Value>,
    interrupt_counter: usize,
}

impl NodeContext {
    pub(crate) fn new(node: impl Into<String>, task_id: impl Into<String>, step: i64, resume: Vec<Value>) -> Self {
        Self {
            node: node.into(),
            task_id: task_id.into(),
            step,
            resume,
            interrupt_counter: 0,
        }
    }

    /// Name of the node being executed
    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Step of the checkpoint this task was scheduled from
    pub fn step(&self) -> i64 {
        self.step
    }

    /// Whether this execution is a replay after a resume
    pub fn is_resuming(&self) -> bool {
        !self.resume.is_empty()
    }

    /// Pause the graph until a value for `payload` is supplied.
    ///
    /// Returns the resume value when one has been supplied for this position, otherwise fails
    /// with [`GraphError::Interrupt`], which the node must propagate.
    pub fn interrupt(&mut self, payload: Value) -> Result<Value> {
        let index = self.interrupt_counter;
        self.interrupt_counter += 1;

        match self.resume.get(index) {
            Some(value) => Ok(value.clone()),
            None => Err(GraphError::Interrupt(Interrupt::for_task(payload, &self.task_id, index))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_interrupt_without_resume_fails() {
        let mut ctx = NodeContext::new("build", "task-1", 3, Vec::new());
        let err = ctx.interrupt(json!({"tool": "sfmobile-native-build"})).unwrap_err();

        match err {
            GraphError::Interrupt(interrupt) => {
                assert_eq!(interrupt.value, json!({"tool": "sfmobile-native-build"}));
                assert_eq!(interrupt.index, 0);
                assert!(!interrupt.id.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resume_values_are_matched_by_position() {
        let mut ctx = NodeContext::new("project_properties", "task-1", 1, vec![json!("MyApp")]);
        assert!(ctx.is_resuming());

        assert_eq!(ctx.interrupt(json!({"ask": "name"})).unwrap(), json!("MyApp"));

        let err = ctx.interrupt(json!({"ask": "package"})).unwrap_err();
        assert!(matches!(err, GraphError::Interrupt(Interrupt { index: 1, .. })));
    }

    #[test]
    fn test_interrupt_ids_are_stable() {
        let a = Interrupt::for_task(json!(1), "task-1", 0);
        let b = Interrupt::for_task(json!(2), "task-1", 0);
        let c = Interrupt::for_task(json!(1), "task-1", 1);
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
    }
}
