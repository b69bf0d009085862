//! In-memory store behavior: validation, ordering, queries, and the
//! optimistic-concurrency guard.

use chrono::{Duration, Utc};
use serde_json::json;

use eventweave::graph::GraphSpec;
use eventweave::run::{RunUpdate, WorkflowRun};
use eventweave::store::{DefinitionStore, MemoryStore, RunStore, StoreError};
use eventweave::types::RunStatus;

mod common;
use common::*;

fn store() -> MemoryStore {
    MemoryStore::new()
}

fn valid_graph() -> GraphSpec {
    GraphSpec::new(
        vec![trigger("t", "e1"), end("done")],
        vec![edge("t", "done")],
    )
}

#[tokio::test]
async fn create_rejects_duplicate_node_ids() {
    let store = store();
    let graph = GraphSpec::new(vec![trigger("t", "e1"), end("t")], vec![]);
    let err = DefinitionStore::create(&store, "dup", graph).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidGraph { .. }));
}

#[tokio::test]
async fn create_rejects_dangling_edges() {
    let store = store();
    let graph = GraphSpec::new(vec![trigger("t", "e1")], vec![edge("t", "ghost")]);
    let err = DefinitionStore::create(&store, "dangling", graph)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidGraph { .. }));
}

#[tokio::test]
async fn create_rejects_condition_without_both_branches() {
    let store = store();
    let graph = GraphSpec::new(
        vec![
            trigger("t", "e1"),
            condition("gate", amount_at_least(1)),
            end("done"),
        ],
        vec![edge("t", "gate"), yes_edge("gate", "done")],
    );
    let err = DefinitionStore::create(&store, "half-gate", graph)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidGraph { .. }));
}

#[tokio::test]
async fn listings_are_newest_first() {
    let store = store();
    let first = DefinitionStore::create(&store, "first", valid_graph())
        .await
        .unwrap();
    let second = DefinitionStore::create(&store, "second", valid_graph())
        .await
        .unwrap();

    let all = store.find_all().await.unwrap();
    assert_eq!(all[0].id, second.id);
    assert_eq!(all[1].id, first.id);

    store.publish(&first.id).await.unwrap();
    store.publish(&second.id).await.unwrap();
    let published: Vec<String> = store
        .find_published()
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(published, vec![second.id, first.id]);
}

#[tokio::test]
async fn publish_unknown_definition_is_not_found() {
    let store = store();
    let err = store.publish(&"nope".to_string()).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[tokio::test]
async fn update_bumps_revision_and_applies_delta() {
    let store = store();
    let run = WorkflowRun::started("wf-1", "t", &json!({"a": 1}));
    let run = RunStore::create(&store, run).await.unwrap();
    assert_eq!(run.revision, 1);

    let updated = store
        .update(
            &run.id,
            1,
            RunUpdate::new()
                .with_status(RunStatus::Paused)
                .with_expected_event("e2")
                .with_last_node("w"),
        )
        .await
        .unwrap();
    assert_eq!(updated.revision, 2);
    assert_eq!(updated.status, RunStatus::Paused);
    assert_eq!(updated.expected_event.as_deref(), Some("e2"));
    assert_eq!(updated.last_node, "w");
    // Untouched fields persist.
    assert_eq!(updated.context, json!({"a": 1}));
}

#[tokio::test]
async fn stale_revision_is_a_conflict() {
    let store = store();
    let run = WorkflowRun::started("wf-1", "t", &json!({}));
    let run = RunStore::create(&store, run).await.unwrap();

    store
        .update(&run.id, 1, RunUpdate::new().with_status(RunStatus::Paused))
        .await
        .unwrap();
    let err = store
        .update(&run.id, 1, RunUpdate::new().with_status(RunStatus::Running))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::RevisionConflict { .. }));
}

#[tokio::test]
async fn paused_queries_filter_by_event_and_age() {
    let store = store();
    let mut waiting = WorkflowRun::started("wf-1", "t", &json!({}));
    waiting.status = RunStatus::Paused;
    waiting.expected_event = Some("e2".into());
    waiting.started_at = Utc::now() - Duration::hours(3);
    let waiting = RunStore::create(&store, waiting).await.unwrap();

    let mut other = WorkflowRun::started("wf-1", "t", &json!({}));
    other.status = RunStatus::Paused;
    other.expected_event = Some("e3".into());
    RunStore::create(&store, other).await.unwrap();

    let running = WorkflowRun::started("wf-1", "t", &json!({}));
    RunStore::create(&store, running).await.unwrap();

    let matching = store.find_paused_by_event("e2").await.unwrap();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].id, waiting.id);

    let stalled = store
        .find_paused_before(Utc::now() - Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(stalled.len(), 1);
    assert_eq!(stalled[0].id, waiting.id);

    assert_eq!(store.find_by_workflow(&"wf-1".to_string()).await.unwrap().len(), 3);
}
