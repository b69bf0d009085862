//! Definition and run persistence.
//!
//! The engine treats its store as a transactional key-value/relational
//! surface, not a specific database product. Two backends ship with the
//! crate:
//!
//! - [`MemoryStore`] — volatile, for tests and development
//! - [`SqliteStore`] — durable SQLite persistence (default `sqlite`
//!   feature) with embedded migrations
//!
//! Run updates are guarded by an optimistic-concurrency revision token:
//! [`RunStore::update`] compares the caller's expected revision and fails
//! with [`StoreError::RevisionConflict`] instead of losing a write when
//! two activations race on the same run.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use thiserror::Error;

use crate::graph::{GraphError, GraphSpec, WorkflowDefinition};
use crate::run::{RunUpdate, WorkflowRun};
use crate::types::{RunId, WorkflowId};

pub mod memory;
#[cfg(feature = "sqlite")]
mod persistence;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("definition rejected: {source}")]
    #[diagnostic(code(eventweave::store::invalid_graph))]
    InvalidGraph {
        #[source]
        #[diagnostic_source]
        source: GraphError,
    },

    #[error("no such {what}: {id}")]
    #[diagnostic(code(eventweave::store::not_found))]
    NotFound { what: &'static str, id: String },

    #[error("run {id} was updated concurrently (expected revision {expected})")]
    #[diagnostic(
        code(eventweave::store::revision_conflict),
        help("Reload the run and retry the update against its current revision.")
    )]
    RevisionConflict { id: RunId, expected: u32 },

    #[error("backend error: {message}")]
    #[diagnostic(code(eventweave::store::backend))]
    Backend { message: String },

    #[error("persisted shape error: {message}")]
    #[diagnostic(
        code(eventweave::store::corrupt),
        help("A stored row no longer matches the expected shape.")
    )]
    Corrupt { message: String },
}

impl From<GraphError> for StoreError {
    fn from(source: GraphError) -> Self {
        StoreError::InvalidGraph { source }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Read/create access to workflow definitions.
///
/// `create` validates the graph before persisting. All listing operations
/// return newest-first so trigger matching scans definitions in reverse
/// creation order.
#[async_trait]
pub trait DefinitionStore: Send + Sync {
    async fn create(&self, name: &str, graph: GraphSpec) -> Result<WorkflowDefinition>;

    async fn find_all(&self) -> Result<Vec<WorkflowDefinition>>;

    async fn find_by_id(&self, id: &WorkflowId) -> Result<Option<WorkflowDefinition>>;

    /// Flip a definition to published so its triggers start matching.
    async fn publish(&self, id: &WorkflowId) -> Result<()>;

    async fn find_published(&self) -> Result<Vec<WorkflowDefinition>>;
}

/// Create/update/query access to run records.
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn create(&self, run: WorkflowRun) -> Result<WorkflowRun>;

    /// Partial update guarded by revision compare-and-set.
    ///
    /// Returns the updated run (revision bumped by one) or
    /// [`StoreError::RevisionConflict`] when `expected_revision` is stale.
    async fn update(
        &self,
        id: &RunId,
        expected_revision: u32,
        update: RunUpdate,
    ) -> Result<WorkflowRun>;

    async fn find_by_id(&self, id: &RunId) -> Result<Option<WorkflowRun>>;

    async fn find_by_workflow(&self, workflow_id: &WorkflowId) -> Result<Vec<WorkflowRun>>;

    /// Paused runs whose `expected_event` equals `event`.
    async fn find_paused_by_event(&self, event: &str) -> Result<Vec<WorkflowRun>>;

    /// Paused runs that started before `cutoff` and are still waiting.
    ///
    /// Read-only monitoring hook over the deliberate "wait forever"
    /// behavior; nothing in the engine mutates runs based on this query.
    async fn find_paused_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<WorkflowRun>>;
}
