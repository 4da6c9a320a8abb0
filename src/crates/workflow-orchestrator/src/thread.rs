//! Thread id resolution
//!
//! Callers round-trip `workflowStateData` (`{"thread_id": "..."}`) between invocations. Anything
//! unusable starts a new thread instead of failing the call.

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

pub const THREAD_ID_PREFIX: &str = "mobile";

const SUFFIX_LEN: usize = 8;

/// State the caller passes back on every call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStateData {
    pub thread_id: String,
}

/// Outcome of looking at the caller's workflow state data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedThread {
    pub thread_id: String,
    pub is_new: bool,
}

/// `mobile-<unix millis>-<8 random lowercase alphanumerics>`
pub fn generate_thread_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();
    format!("{}-{}-{}", THREAD_ID_PREFIX, Utc::now().timestamp_millis(), suffix)
}

/// Accepts an object or a string holding a JSON object
fn parse_state_data(data: &Value) -> Result<WorkflowStateData, serde_json::Error> {
    match data {
        Value::String(text) => serde_json::from_str(text),
        other => WorkflowStateData::deserialize(other),
    }
}

pub fn resolve_thread_id(workflow_state_data: Option<&Value>) -> ResolvedThread {
    let existing = match workflow_state_data {
        None | Some(Value::Null) => None,
        Some(data) => match parse_state_data(data) {
            Ok(state) if !state.thread_id.trim().is_empty() => Some(state.thread_id),
            Ok(_) => {
                info!("Workflow state data has an empty thread_id, starting a new thread");
                None
            }
            Err(e) => {
                info!(error = %e, "Unparsable workflow state data, starting a new thread");
                None
            }
        },
    };

    match existing {
        Some(thread_id) => ResolvedThread {
            thread_id,
            is_new: false,
        },
        None => {
            let thread_id = generate_thread_id();
            info!(thread_id = %thread_id, "Generated new workflow thread");
            ResolvedThread {
                thread_id,
                is_new: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generated_ids_have_expected_shape() {
        let id = generate_thread_id();
        let parts: Vec<&str> = id.splitn(3, '-').collect();

        assert_eq!(parts[0], "mobile");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        assert_ne!(generate_thread_id(), generate_thread_id());
    }

    #[test]
    fn test_existing_thread_id_is_kept() {
        let resolved = resolve_thread_id(Some(&json!({"thread_id": "mobile-1-abc"})));
        assert_eq!(resolved.thread_id, "mobile-1-abc");
        assert!(!resolved.is_new);
    }

    #[test]
    fn test_stringified_state_data_is_accepted() {
        let resolved = resolve_thread_id(Some(&json!("{\"thread_id\":\"mobile-2-xyz\"}")));
        assert_eq!(resolved.thread_id, "mobile-2-xyz");
    }

    #[test]
    fn test_unusable_state_data_starts_new_thread() {
        for data in [
            None,
            Some(json!(null)),
            Some(json!({"thread_id": ""})),
            Some(json!({"thread_id": 42})),
            Some(json!("{not json")),
            Some(json!([1, 2])),
        ] {
            let resolved = resolve_thread_id(data.as_ref());
            assert!(resolved.is_new, "expected a new thread for {:?}", data);
            assert!(resolved.thread_id.starts_with("mobile-"));
        }
    }
}
