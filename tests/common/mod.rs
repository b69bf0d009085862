#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use eventweave::bus::DomainEvent;
use eventweave::condition::{CmpOp, Condition};
use eventweave::dispatch::{
    CommandChannel, CommandDispatcher, CommandTransport, DispatchError, MemoryTransport,
};
use eventweave::engine::Engine;
use eventweave::graph::{EdgeLabel, EdgeSpec, GraphSpec, NodeSpec};
use eventweave::ingest::IngestionLoop;
use eventweave::store::{DefinitionStore, MemoryStore};

pub fn trigger(id: &str, event: &str) -> NodeSpec {
    NodeSpec::Trigger {
        id: id.into(),
        event: event.into(),
    }
}

pub fn condition(id: &str, expression: Condition) -> NodeSpec {
    NodeSpec::Condition {
        id: id.into(),
        expression,
    }
}

pub fn wait(id: &str, event: &str) -> NodeSpec {
    NodeSpec::Wait {
        id: id.into(),
        event: event.into(),
    }
}

pub fn action(id: &str, pattern: &str, payload: Value) -> NodeSpec {
    NodeSpec::Action {
        id: id.into(),
        pattern: pattern.into(),
        queue: None,
        payload,
    }
}

pub fn end(id: &str) -> NodeSpec {
    NodeSpec::End { id: id.into() }
}

pub fn edge(source: &str, target: &str) -> EdgeSpec {
    EdgeSpec::new(source, target)
}

pub fn yes_edge(source: &str, target: &str) -> EdgeSpec {
    EdgeSpec::labeled(source, target, EdgeLabel::Yes)
}

pub fn no_edge(source: &str, target: &str) -> EdgeSpec {
    EdgeSpec::labeled(source, target, EdgeLabel::No)
}

/// `amount >= threshold` — a small condition used across tests.
pub fn amount_at_least(threshold: i64) -> Condition {
    Condition::Cmp {
        key: "amount".into(),
        cmp: CmpOp::Gte,
        value: json!(threshold),
    }
}

pub fn event(name: &str, payload: Value) -> DomainEvent {
    DomainEvent::new(name, payload)
}

/// Everything an ingestion test needs, wired over in-memory backends.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub transport: Arc<MemoryTransport>,
    pub ingest: IngestionLoop,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(MemoryTransport::new());
    let dispatcher = Arc::new(CommandDispatcher::new(transport.clone()));
    let engine = Engine::new(store.clone(), dispatcher);
    let ingest = IngestionLoop::new(store.clone(), store.clone(), engine);
    Harness {
        store,
        transport,
        ingest,
    }
}

/// Harness variant whose dispatcher fails every send.
pub fn failing_harness() -> (Arc<MemoryStore>, IngestionLoop) {
    let store = Arc::new(MemoryStore::new());
    let dispatcher = Arc::new(CommandDispatcher::new(Arc::new(FailingTransport)));
    let engine = Engine::new(store.clone(), dispatcher);
    let ingest = IngestionLoop::new(store.clone(), store.clone(), engine);
    (store, ingest)
}

/// Create a definition without publishing it.
pub async fn draft(
    store: &Arc<MemoryStore>,
    name: &str,
    graph: GraphSpec,
) -> eventweave::graph::WorkflowDefinition {
    store.create(name, graph).await.expect("valid graph")
}

/// Create a published definition and return it.
pub async fn published(
    store: &Arc<MemoryStore>,
    name: &str,
    graph: GraphSpec,
) -> eventweave::graph::WorkflowDefinition {
    let definition = store.create(name, graph).await.expect("valid graph");
    store.publish(&definition.id).await.expect("definition exists");
    store
        .find_by_id(&definition.id)
        .await
        .expect("store available")
        .expect("definition exists")
}

/// Transport whose channels open fine but reject every send.
pub struct FailingTransport;

#[async_trait]
impl CommandTransport for FailingTransport {
    async fn open(&self, _queue: &str) -> Result<Arc<dyn CommandChannel>, DispatchError> {
        Ok(Arc::new(FailingChannel))
    }
}

struct FailingChannel;

#[async_trait]
impl CommandChannel for FailingChannel {
    async fn send(&self, _pattern: &str, _payload: Value) -> Result<(), DispatchError> {
        Err(DispatchError::SendFailed {
            queue: "unreachable".into(),
            message: "broker unreachable".into(),
        })
    }
}
