//! # Eventweave: event-driven workflow orchestration
//!
//! Eventweave stores directed-graph process definitions, executes them as
//! long-lived runs, suspends execution on WAIT nodes pending external
//! events, resumes on matching events, and dispatches fire-and-forget
//! commands to other services over named queues.
//!
//! ## Core Concepts
//!
//! - **Definition**: a named graph of TRIGGER/CONDITION/WAIT/ACTION/END
//!   nodes, stored as data and read-only to the engine
//! - **Run**: one execution instance with its own status and accumulated
//!   JSON context; a paused run's record *is* the continuation
//! - **Domain event**: a named fact that starts new runs and resumes
//!   paused ones
//! - **Command dispatch**: one-way messages to per-service queues, with
//!   `{{placeholder}}` payload templating
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use eventweave::bus::EventBus;
//! use eventweave::dispatch::{CommandDispatcher, MemoryTransport};
//! use eventweave::engine::Engine;
//! use eventweave::graph::{EdgeSpec, GraphSpec, NodeSpec};
//! use eventweave::ingest::IngestionLoop;
//! use eventweave::store::{DefinitionStore, MemoryStore};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let transport = Arc::new(MemoryTransport::new());
//! let dispatcher = Arc::new(CommandDispatcher::new(transport.clone()));
//! let engine = Engine::new(store.clone(), dispatcher);
//! let ingest = IngestionLoop::new(store.clone(), store.clone(), engine);
//!
//! let graph = GraphSpec::new(
//!     vec![
//!         NodeSpec::Trigger { id: "t".into(), event: "order.created".into() },
//!         NodeSpec::Action {
//!             id: "a".into(),
//!             pattern: "billing.invoice".into(),
//!             queue: None,
//!             payload: json!({"order": "{{order_id}}"}),
//!         },
//!         NodeSpec::End { id: "e".into() },
//!     ],
//!     vec![EdgeSpec::new("t", "a"), EdgeSpec::new("a", "e")],
//! );
//! let definition = store.create("invoice-on-order", graph).await?;
//! store.publish(&definition.id).await?;
//!
//! let bus = EventBus::new();
//! let commands = transport.subscribe("billing_queue");
//! bus.publish("order.created", json!({"order_id": "A-17"}));
//!
//! let subscription = bus.subscribe();
//! let event = subscription.recv().await.expect("event published above");
//! let report = ingest.handle_event(&event).await?;
//! assert_eq!(report.started.len(), 1);
//! assert_eq!(commands.try_recv()?.payload, json!({"order": "A-17"}));
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Guide
//!
//! - [`graph`] - Definition data model and validation
//! - [`condition`] - Boolean condition AST and evaluation
//! - [`template`] - Payload placeholder rendering
//! - [`run`] - Run records and partial updates
//! - [`store`] - Definition/run persistence (memory + SQLite)
//! - [`dispatch`] - Command transport and channel pooling
//! - [`engine`] - The traversal state machine
//! - [`bus`] - In-process domain event bus
//! - [`ingest`] - Event ingestion loop and monitoring hook

pub mod bus;
pub mod condition;
pub mod dispatch;
pub mod engine;
pub mod graph;
pub mod ingest;
pub mod run;
pub mod store;
pub mod telemetry;
pub mod template;
pub mod types;
