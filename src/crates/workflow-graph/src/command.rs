//! Inputs accepted by [`CompiledGraph::invoke`](crate::CompiledGraph::invoke)

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Control command for a thread that is already running
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Answer the thread's pending interrupt with this value and continue
    Resume(Value),
}

impl Command {
    pub fn resume(value: impl Into<Value>) -> Self {
        Self::Resume(value.into())
    }
}

/// What to feed into an invocation
#[derive(Debug, Clone, PartialEq)]
pub enum GraphInput {
    /// Start a run: merge this object into state and schedule the entry nodes
    Start(Value),
    /// Continue a paused run
    Command(Command),
}

impl GraphInput {
    pub fn start(value: impl Into<Value>) -> Self {
        Self::Start(value.into())
    }

    pub fn is_resume(&self) -> bool {
        matches!(self, Self::Command(Command::Resume(_)))
    }
}

impl From<Command> for GraphInput {
    fn from(command: Command) -> Self {
        Self::Command(command)
    }
}
