//! Volatile in-memory store for tests and development.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;

use super::{DefinitionStore, Result, RunStore, StoreError};
use crate::graph::{GraphSpec, WorkflowDefinition};
use crate::run::{RunUpdate, WorkflowRun};
use crate::types::{RunId, RunStatus, WorkflowId};

/// In-memory implementation of both store traits.
///
/// Definitions are kept in insertion order and listed newest-first; runs
/// live in a map keyed by id. All mutation happens under one mutex, which
/// makes every operation atomic — the revision check in [`update`]
/// mirrors the guarded SQL update of the durable backend.
///
/// [`update`]: RunStore::update
#[derive(Debug, Default)]
pub struct MemoryStore {
    definitions: Mutex<Vec<WorkflowDefinition>>,
    runs: Mutex<FxHashMap<RunId, WorkflowRun>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DefinitionStore for MemoryStore {
    async fn create(&self, name: &str, graph: GraphSpec) -> Result<WorkflowDefinition> {
        graph.validate()?;
        let definition = WorkflowDefinition::new(name, graph);
        self.definitions
            .lock()
            .expect("definition store poisoned")
            .push(definition.clone());
        Ok(definition)
    }

    async fn find_all(&self) -> Result<Vec<WorkflowDefinition>> {
        let guard = self.definitions.lock().expect("definition store poisoned");
        Ok(guard.iter().rev().cloned().collect())
    }

    async fn find_by_id(&self, id: &WorkflowId) -> Result<Option<WorkflowDefinition>> {
        let guard = self.definitions.lock().expect("definition store poisoned");
        Ok(guard.iter().find(|d| &d.id == id).cloned())
    }

    async fn publish(&self, id: &WorkflowId) -> Result<()> {
        let mut guard = self.definitions.lock().expect("definition store poisoned");
        match guard.iter_mut().find(|d| &d.id == id) {
            Some(definition) => {
                definition.published = true;
                Ok(())
            }
            None => Err(StoreError::NotFound {
                what: "workflow definition",
                id: id.clone(),
            }),
        }
    }

    async fn find_published(&self) -> Result<Vec<WorkflowDefinition>> {
        let guard = self.definitions.lock().expect("definition store poisoned");
        Ok(guard.iter().rev().filter(|d| d.published).cloned().collect())
    }
}

#[async_trait]
impl RunStore for MemoryStore {
    async fn create(&self, run: WorkflowRun) -> Result<WorkflowRun> {
        let mut guard = self.runs.lock().expect("run store poisoned");
        guard.insert(run.id.clone(), run.clone());
        Ok(run)
    }

    async fn update(
        &self,
        id: &RunId,
        expected_revision: u32,
        update: RunUpdate,
    ) -> Result<WorkflowRun> {
        let mut guard = self.runs.lock().expect("run store poisoned");
        let run = guard.get_mut(id).ok_or_else(|| StoreError::NotFound {
            what: "workflow run",
            id: id.clone(),
        })?;
        if run.revision != expected_revision {
            return Err(StoreError::RevisionConflict {
                id: id.clone(),
                expected: expected_revision,
            });
        }
        run.apply(&update);
        Ok(run.clone())
    }

    async fn find_by_id(&self, id: &RunId) -> Result<Option<WorkflowRun>> {
        let guard = self.runs.lock().expect("run store poisoned");
        Ok(guard.get(id).cloned())
    }

    async fn find_by_workflow(&self, workflow_id: &WorkflowId) -> Result<Vec<WorkflowRun>> {
        let guard = self.runs.lock().expect("run store poisoned");
        let mut runs: Vec<WorkflowRun> = guard
            .values()
            .filter(|r| &r.workflow_id == workflow_id)
            .cloned()
            .collect();
        runs.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        Ok(runs)
    }

    async fn find_paused_by_event(&self, event: &str) -> Result<Vec<WorkflowRun>> {
        let guard = self.runs.lock().expect("run store poisoned");
        Ok(guard
            .values()
            .filter(|r| {
                r.status == RunStatus::Paused && r.expected_event.as_deref() == Some(event)
            })
            .cloned()
            .collect())
    }

    async fn find_paused_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<WorkflowRun>> {
        let guard = self.runs.lock().expect("run store poisoned");
        Ok(guard
            .values()
            .filter(|r| r.status == RunStatus::Paused && r.started_at < cutoff)
            .cloned()
            .collect())
    }
}
