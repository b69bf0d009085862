//! Run records: one execution instance of a definition.
//!
//! The run record *is* the continuation. WAIT nodes fragment a logical run
//! into multiple traversal activations over time, and `last_node` plus
//! `expected_event` are the only state needed to resume mid-graph. Runs are
//! never deleted by the engine; terminal runs stay queryable for audit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{NodeId, RunId, RunStatus, WorkflowId};

/// One execution instance of a workflow definition.
///
/// Invariants maintained by the engine and enforced by the stores:
/// - `status == Paused` iff `expected_event` is set
/// - a terminal `status` implies `ended_at` is set
/// - `revision` increases by one on every store update
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: RunId,
    pub workflow_id: WorkflowId,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub last_node: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub context: Value,
    pub revision: u32,
}

impl WorkflowRun {
    /// Fresh `Running` run created from a matched TRIGGER node.
    ///
    /// The trigger payload seeds the context when it is a JSON object;
    /// any other payload shape seeds an empty object.
    #[must_use]
    pub fn started(
        workflow_id: impl Into<WorkflowId>,
        trigger_node: impl Into<NodeId>,
        payload: &Value,
    ) -> Self {
        let context = if payload.is_object() {
            payload.clone()
        } else {
            Value::Object(serde_json::Map::new())
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workflow_id: workflow_id.into(),
            status: RunStatus::Running,
            started_at: Utc::now(),
            ended_at: None,
            last_node: trigger_node.into(),
            expected_event: None,
            error: None,
            context,
            revision: 1,
        }
    }

    /// Shallow-merge an event payload into the run context.
    ///
    /// Later events win per key. Non-object payloads leave the context
    /// unchanged.
    pub fn merge_context(&mut self, payload: &Value) {
        let Some(incoming) = payload.as_object() else {
            return;
        };
        if !self.context.is_object() {
            self.context = Value::Object(serde_json::Map::new());
        }
        let ctx = self
            .context
            .as_object_mut()
            .expect("context normalized to object above");
        for (k, v) in incoming {
            ctx.insert(k.clone(), v.clone());
        }
    }

    /// Apply a partial update in place, bumping the revision.
    ///
    /// Used by the in-memory store; the SQLite store applies the same
    /// delta as a guarded SQL update.
    pub fn apply(&mut self, update: &RunUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(ended_at) = update.ended_at {
            self.ended_at = Some(ended_at);
        }
        if let Some(last_node) = &update.last_node {
            self.last_node = last_node.clone();
        }
        if let Some(expected_event) = &update.expected_event {
            self.expected_event = expected_event.clone();
        }
        if let Some(error) = &update.error {
            self.error = Some(error.clone());
        }
        if let Some(context) = &update.context {
            self.context = context.clone();
        }
        self.revision += 1;
    }

    /// Capture this run's full mutable state as an update delta.
    ///
    /// The traversal engine mutates a run in memory across a whole
    /// activation, then persists once with the accumulated delta.
    #[must_use]
    pub fn as_update(&self) -> RunUpdate {
        RunUpdate {
            status: Some(self.status),
            ended_at: self.ended_at,
            last_node: Some(self.last_node.clone()),
            expected_event: Some(self.expected_event.clone()),
            error: self.error.clone(),
            context: Some(self.context.clone()),
        }
    }
}

/// Partial update applied through [`RunStore::update`](crate::store::RunStore::update).
///
/// Every field is optional; `expected_event` is doubly optional so an
/// update can distinguish "leave as is" (`None`) from "clear"
/// (`Some(None)`).
#[derive(Clone, Debug, Default)]
pub struct RunUpdate {
    pub status: Option<RunStatus>,
    pub ended_at: Option<DateTime<Utc>>,
    pub last_node: Option<NodeId>,
    pub expected_event: Option<Option<String>>,
    pub error: Option<String>,
    pub context: Option<Value>,
}

impl RunUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_status(mut self, status: RunStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_last_node(mut self, last_node: impl Into<NodeId>) -> Self {
        self.last_node = Some(last_node.into());
        self
    }

    #[must_use]
    pub fn with_expected_event(mut self, event: impl Into<String>) -> Self {
        self.expected_event = Some(Some(event.into()));
        self
    }

    #[must_use]
    pub fn clear_expected_event(mut self) -> Self {
        self.expected_event = Some(None);
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}
