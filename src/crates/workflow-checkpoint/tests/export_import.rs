//! Whole-store export/import behaviour across threads, interrupts and restarts

use futures::StreamExt;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use workflow_checkpoint::{
    Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointSaver, CheckpointSource,
    CheckpointTuple, JsonCheckpointSaver,
};

async fn history(saver: &JsonCheckpointSaver, thread_id: &str) -> Vec<CheckpointTuple> {
    saver
        .list(Some(&CheckpointConfig::for_thread(thread_id)), None, None, None)
        .await
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
        .await
}

/// Simulates one orchestrator call: import, advance the thread, export
async fn run_step(blob: Option<&str>, thread_id: &str, step: i64, value: Value) -> String {
    let saver = match blob {
        Some(blob) => JsonCheckpointSaver::from_exported(blob).await.unwrap(),
        None => JsonCheckpointSaver::new(),
    };

    let config = CheckpointConfig::for_thread(thread_id);
    let parent = saver.get_tuple(&config).await.unwrap();
    let (mut checkpoint, config) = match parent {
        Some(tuple) => (tuple.checkpoint.successor(), tuple.config),
        None => (Checkpoint::empty(), config),
    };
    checkpoint.channel_values.insert("userInput".to_string(), value.clone());

    let saved = saver
        .put(
            &config,
            checkpoint,
            CheckpointMetadata::new().with_source(CheckpointSource::Loop).with_step(step),
            BTreeMap::new(),
        )
        .await
        .unwrap();
    saver
        .put_writes(
            &saved,
            vec![("__interrupt__".to_string(), json!({"question": value}))],
            format!("task-{step}"),
        )
        .await
        .unwrap();

    saver.export_state().await.unwrap()
}

#[tokio::test]
async fn test_threads_survive_repeated_processes() {
    let mut blob = run_step(None, "thread-a", 0, json!("a0")).await;
    blob = run_step(Some(&blob), "thread-b", 0, json!("b0")).await;
    blob = run_step(Some(&blob), "thread-a", 1, json!("a1")).await;

    let saver = JsonCheckpointSaver::from_exported(&blob).await.unwrap();
    assert_eq!(saver.thread_count().await, 2);

    let thread_a = history(&saver, "thread-a").await;
    let steps: Vec<_> = thread_a.iter().map(|t| t.metadata.step.unwrap()).collect();
    assert_eq!(steps, vec![1, 0]);
    assert_eq!(thread_a[0].parent_config, Some(thread_a[1].config.clone()));
    assert_eq!(
        thread_a[0].pending_writes,
        vec![(
            "task-1".to_string(),
            "__interrupt__".to_string(),
            json!({"question": "a1"})
        )]
    );

    let thread_b = history(&saver, "thread-b").await;
    assert_eq!(thread_b.len(), 1);
    assert_eq!(thread_b[0].checkpoint.channel_values["userInput"], json!("b0"));
}

#[tokio::test]
async fn test_import_replaces_existing_contents() {
    let blob = run_step(None, "thread-a", 0, json!("a0")).await;

    let saver = JsonCheckpointSaver::new();
    saver
        .put(
            &CheckpointConfig::for_thread("stale"),
            Checkpoint::empty(),
            CheckpointMetadata::new(),
            BTreeMap::new(),
        )
        .await
        .unwrap();

    saver.import_state(&blob).await.unwrap();
    assert!(history(&saver, "stale").await.is_empty());
    assert_eq!(history(&saver, "thread-a").await.len(), 1);
}

fn json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        "[a-zA-Z0-9 _./-]{0,24}".prop_map(Value::from),
    ]
}

fn json_value() -> impl Strategy<Value = Value> {
    json_leaf().prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::from),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn exported_state_reimports_identically(
        values in prop::collection::btree_map("[a-zA-Z]{1,12}", json_value(), 0..8),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(async {
            let saver = JsonCheckpointSaver::new();
            let checkpoint = Checkpoint::new(values.clone(), BTreeMap::new(), BTreeMap::new());
            let config = saver
                .put(&CheckpointConfig::for_thread("prop"), checkpoint, CheckpointMetadata::new(), BTreeMap::new())
                .await
                .unwrap();

            let exported = saver.export_state().await.unwrap();
            let restored = JsonCheckpointSaver::from_exported(&exported).await.unwrap();
            let tuple = restored.get_tuple(&config).await.unwrap().unwrap();

            prop_assert_eq!(tuple.checkpoint.channel_values, values);
            prop_assert_eq!(restored.export_state().await.unwrap(), exported);
            Ok(())
        })?;
    }
}
