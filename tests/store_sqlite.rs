//! SQLite store round-trips and the guarded update.

#![cfg(feature = "sqlite")]

use chrono::{Duration, Utc};
use serde_json::json;
use tempfile::TempDir;

use eventweave::graph::GraphSpec;
use eventweave::run::{RunUpdate, WorkflowRun};
use eventweave::store::{DefinitionStore, RunStore, SqliteStore, StoreError};
use eventweave::types::RunStatus;

mod common;
use common::*;

async fn open_store() -> (TempDir, SqliteStore) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("eventweave-test.db");
    std::fs::File::create(&path).expect("create db file");
    let store = SqliteStore::connect(&format!("sqlite://{}", path.display()))
        .await
        .expect("connect + migrate");
    (dir, store)
}

fn sample_graph() -> GraphSpec {
    GraphSpec::new(
        vec![
            trigger("t", "e1"),
            condition("gate", amount_at_least(100)),
            action("a", "svc.cmd", json!({"x": "{{x}}"})),
            wait("w", "e2"),
            end("done"),
        ],
        vec![
            edge("t", "gate"),
            yes_edge("gate", "a"),
            no_edge("gate", "w"),
            edge("a", "done"),
            edge("w", "done"),
        ],
    )
}

#[tokio::test]
async fn definitions_round_trip_through_json_columns() {
    let (_dir, store) = open_store().await;
    let created = DefinitionStore::create(&store, "round-trip", sample_graph())
        .await
        .unwrap();
    assert!(!created.published);

    let loaded = DefinitionStore::find_by_id(&store, &created.id)
        .await
        .unwrap()
        .expect("stored definition");
    assert_eq!(loaded.graph, created.graph);
    assert_eq!(loaded.name, "round-trip");

    store.publish(&created.id).await.unwrap();
    let published = store.find_published().await.unwrap();
    assert_eq!(published.len(), 1);
    assert!(published[0].published);
}

#[tokio::test]
async fn create_still_validates_graphs() {
    let (_dir, store) = open_store().await;
    let graph = GraphSpec::new(vec![trigger("t", "e1")], vec![edge("t", "ghost")]);
    let err = DefinitionStore::create(&store, "bad", graph)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidGraph { .. }));
}

#[tokio::test]
async fn runs_round_trip_and_update_is_guarded() {
    let (_dir, store) = open_store().await;
    let definition = DefinitionStore::create(&store, "wf", sample_graph())
        .await
        .unwrap();

    let run = WorkflowRun::started(definition.id.clone(), "t", &json!({"x": "42"}));
    let run = RunStore::create(&store, run).await.unwrap();

    let loaded = RunStore::find_by_id(&store, &run.id)
        .await
        .unwrap()
        .expect("stored run");
    assert_eq!(loaded.status, RunStatus::Running);
    assert_eq!(loaded.context, json!({"x": "42"}));
    assert_eq!(loaded.revision, 1);

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

    let err = store
        .update(&run.id, 1, RunUpdate::new().with_status(RunStatus::Running))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::RevisionConflict { .. }));

    let paused = store.find_paused_by_event("e2").await.unwrap();
    assert_eq!(paused.len(), 1);
    assert_eq!(paused[0].id, run.id);
    assert!(store.find_paused_by_event("e9").await.unwrap().is_empty());
}

#[tokio::test]
async fn paused_age_query_uses_run_start() {
    let (_dir, store) = open_store().await;
    let definition = DefinitionStore::create(&store, "wf", sample_graph())
        .await
        .unwrap();

    let mut old = WorkflowRun::started(definition.id.clone(), "t", &json!({}));
    old.status = RunStatus::Paused;
    old.expected_event = Some("e2".into());
    old.started_at = Utc::now() - Duration::hours(5);
    let old = RunStore::create(&store, old).await.unwrap();

    let mut fresh = WorkflowRun::started(definition.id, "t", &json!({}));
    fresh.status = RunStatus::Paused;
    fresh.expected_event = Some("e2".into());
    RunStore::create(&store, fresh).await.unwrap();

    let stalled = store
        .find_paused_before(Utc::now() - Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(stalled.len(), 1);
    assert_eq!(stalled[0].id, old.id);
}

#[tokio::test]
async fn terminal_fields_persist() {
    let (_dir, store) = open_store().await;
    let definition = DefinitionStore::create(&store, "wf", sample_graph())
        .await
        .unwrap();
    let run = WorkflowRun::started(definition.id.clone(), "t", &json!({}));
    let run = RunStore::create(&store, run).await.unwrap();

    let mut failed = run.clone();
    failed.status = RunStatus::Error;
    failed.error = Some("send to svc_queue failed".into());
    failed.ended_at = Some(Utc::now());
    store.update(&run.id, 1, failed.as_update()).await.unwrap();

    let loaded = RunStore::find_by_id(&store, &run.id)
        .await
        .unwrap()
        .expect("stored run");
    assert_eq!(loaded.status, RunStatus::Error);
    assert!(loaded.error.as_deref().unwrap().contains("svc_queue"));
    assert!(loaded.ended_at.is_some());
    let by_workflow = store.find_by_workflow(&definition.id).await.unwrap();
    assert_eq!(by_workflow.len(), 1);
}
