//! Orchestration prompt text returned to the calling agent

use crate::thread::WorkflowStateData;
use crate::tool_call::NextToolCall;
use serde_json::Value;

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Instructions for invoking `call`, then calling `orchestrator_tool` back with the result and
/// the thread id
pub fn build_orchestration_prompt(
    call: &NextToolCall,
    thread_id: &str,
    orchestrator_tool: &str,
) -> String {
    let state_data = serde_json::to_value(WorkflowStateData {
        thread_id: thread_id.to_string(),
    })
    .unwrap_or(Value::Null);

    format!(
        r#"# ROLE

You are the workflow orchestrator for a multi-step mobile app workflow. Follow the instructions
below exactly; the workflow pauses until you report back.

# TASK

Invoke the `{tool}` tool next.

{description}

## Input schema for `{tool}`

```json
{schema}
```

## Input values

Call `{tool}` with this input:

```json
{input}
```

# POST-TOOL-INVOCATION

After `{tool}` completes, invoke the `{orchestrator}` tool with:

- `userInput`: the complete result returned by `{tool}`
- `workflowStateData`: exactly the following object, unchanged

```json
{state}
```
"#,
        tool = call.tool_name,
        description = call.description,
        schema = pretty(&call.input_schema),
        input = pretty(&call.input),
        orchestrator = orchestrator_tool,
        state = pretty(&state_data),
    )
}

/// Message returned once the workflow has no more steps
pub fn completion_message(thread_id: &str) -> String {
    format!(
        "The workflow for thread `{}` has completed. No further tool calls are required.",
        thread_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prompt_embeds_call_and_thread() {
        let call = NextToolCall::new(
            "sfmobile-native-template-discovery",
            "Find a template for the requested platform.",
            json!({"type": "object", "properties": {"platform": {"type": "string"}}}),
            json!({"platform": "Android"}),
        );

        let prompt = build_orchestration_prompt(&call, "mobile-1-abcdefgh", "sfmobile-native-project-manager");

        assert!(prompt.contains("Invoke the `sfmobile-native-template-discovery` tool next."));
        assert!(prompt.contains("Find a template for the requested platform."));
        assert!(prompt.contains("\"platform\": \"Android\""));
        assert!(prompt.contains("\"type\": \"object\""));
        assert!(prompt.contains("\"thread_id\": \"mobile-1-abcdefgh\""));
        assert!(prompt.contains("invoke the `sfmobile-native-project-manager` tool"));
    }

    #[test]
    fn test_completion_message_names_thread() {
        assert!(completion_message("mobile-1-abcdefgh").contains("mobile-1-abcdefgh"));
    }
}
