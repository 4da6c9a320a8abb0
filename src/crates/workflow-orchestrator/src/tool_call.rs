//! The "invoke this tool next" payload carried by workflow interrupts

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use workflow_graph::{NodeContext, Result as GraphResult};

/// Describes the tool the caller must invoke before the workflow can continue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextToolCall {
    pub tool_name: String,
    pub description: String,
    /// JSON schema of the tool's input
    pub input_schema: Value,
    /// Concrete input values for the call
    pub input: Value,
}

impl NextToolCall {
    pub fn new(
        tool_name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        input: Value,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            description: description.into(),
            input_schema,
            input,
        }
    }

    /// Build from a typed tool input, deriving the schema from its `JsonSchema` impl
    pub fn for_input<T>(
        tool_name: impl Into<String>,
        description: impl Into<String>,
        input: &T,
    ) -> serde_json::Result<Self>
    where
        T: JsonSchema + Serialize,
    {
        let schema = serde_json::to_value(schemars::schema_for!(T))?;
        Ok(Self::new(tool_name, description, schema, serde_json::to_value(input)?))
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    pub fn from_value(value: &Value) -> serde_json::Result<Self> {
        Self::deserialize(value)
    }

    /// Pause the running node until the caller reports the tool's result, which is returned
    pub fn interrupt(&self, ctx: &mut NodeContext) -> GraphResult<Value> {
        ctx.interrupt(self.to_value()?)
    }
}
