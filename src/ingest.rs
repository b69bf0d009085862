//! Event ingestion: the only entry point into the traversal engine.
//!
//! Every inbound domain event makes two passes:
//!
//! 1. **Resume** — paused runs whose `expected_event` matches are flipped
//!    back to `Running`, the payload is merged into their context, and a
//!    fresh activation continues after their WAIT node.
//! 2. **Start** — every published definition with a TRIGGER node matching
//!    the event name gets a brand-new run traversed from that trigger.
//!
//! Both passes run for every event; one event can simultaneously resume
//! existing runs and start new ones. A failure confined to one run (bad
//! definition, lost resume race, dispatch failure captured on the run) is
//! logged and skipped; store failures propagate to the caller.

use std::sync::Arc;

use chrono::Utc;
use futures_util::StreamExt;
use miette::Diagnostic;
use thiserror::Error;
use tracing::instrument;

use crate::bus::{DomainEvent, EventSubscription};
use crate::engine::{Engine, EngineError};
use crate::graph::NodeSpec;
use crate::run::{RunUpdate, WorkflowRun};
use crate::store::{DefinitionStore, RunStore, StoreError};
use crate::types::{RunId, RunStatus};

#[derive(Debug, Error, Diagnostic)]
pub enum IngestError {
    #[error(transparent)]
    #[diagnostic(code(eventweave::ingest::store))]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(code(eventweave::ingest::engine))]
    Engine(#[from] EngineError),
}

/// What one event did: which runs it resumed and which it started.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub resumed: Vec<RunId>,
    pub started: Vec<RunId>,
}

/// Consumes the domain event bus and drives the engine.
pub struct IngestionLoop {
    definitions: Arc<dyn DefinitionStore>,
    runs: Arc<dyn RunStore>,
    engine: Engine,
}

impl IngestionLoop {
    #[must_use]
    pub fn new(
        definitions: Arc<dyn DefinitionStore>,
        runs: Arc<dyn RunStore>,
        engine: Engine,
    ) -> Self {
        Self {
            definitions,
            runs,
            engine,
        }
    }

    /// Consume events until the bus closes.
    ///
    /// A failing event is logged and the loop keeps going; one bad event
    /// must not starve every other workflow.
    pub async fn run(&self, subscription: EventSubscription) {
        let mut events = subscription.into_stream();
        while let Some(event) = events.next().await {
            if let Err(error) = self.handle_event(&event).await {
                tracing::error!(event = %event.name, %error, "event processing failed");
            }
        }
        tracing::info!("event bus closed; ingestion loop stopping");
    }

    /// Process one domain event: resume matching paused runs, then start
    /// runs for published definitions with a matching trigger.
    #[instrument(skip(self, event), fields(event = %event.name), err)]
    pub async fn handle_event(&self, event: &DomainEvent) -> Result<IngestReport, IngestError> {
        let mut report = IngestReport::default();

        for run in self.runs.find_paused_by_event(&event.name).await? {
            if let Some(run_id) = self.resume_run(run, event).await? {
                report.resumed.push(run_id);
            }
        }

        for definition in self.definitions.find_published().await? {
            let triggers: Vec<String> = definition
                .graph
                .triggers_for(&event.name)
                .map(|node| node.id().to_string())
                .collect();
            for trigger_id in triggers {
                let run = WorkflowRun::started(definition.id.clone(), &trigger_id, &event.payload);
                let mut run = self.runs.create(run).await?;
                self.engine.traverse(&definition, &mut run, &trigger_id).await?;
                report.started.push(run.id);
            }
        }

        tracing::debug!(
            event = %event.name,
            resumed = report.resumed.len(),
            started = report.started.len(),
            "event processed"
        );
        Ok(report)
    }

    /// Resume one paused run. Returns `None` when the run was skipped
    /// (missing/stale definition or a lost resume race).
    async fn resume_run(
        &self,
        run: WorkflowRun,
        event: &DomainEvent,
    ) -> Result<Option<RunId>, IngestError> {
        let Some(definition) = self.definitions.find_by_id(&run.workflow_id).await? else {
            tracing::warn!(
                run_id = %run.id,
                workflow = %run.workflow_id,
                "paused run references missing definition; skipping"
            );
            return Ok(None);
        };
        let wait_node = run.last_node.clone();
        if !matches!(definition.graph.node(&wait_node), Some(NodeSpec::Wait { .. })) {
            tracing::warn!(
                run_id = %run.id,
                node = %wait_node,
                "paused run's last node is not a WAIT node in its definition; skipping"
            );
            return Ok(None);
        }

        let mut resumed = run;
        resumed.merge_context(&event.payload);
        let transition = RunUpdate::new()
            .with_status(RunStatus::Running)
            .clear_expected_event()
            .with_context(resumed.context.clone());
        let mut resumed = match self
            .runs
            .update(&resumed.id, resumed.revision, transition)
            .await
        {
            Ok(run) => run,
            Err(StoreError::RevisionConflict { id, .. }) => {
                // Another delivery already resumed this run; it has one
                // expected event, so the other side owns it now.
                tracing::warn!(run_id = %id, "lost resume race; skipping");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        self.engine.resume(&definition, &mut resumed, &wait_node).await?;
        Ok(Some(resumed.id))
    }

    /// Monitoring hook over the deliberate absence of a pause timeout:
    /// logs every run that has been paused since before `now - max_age`
    /// and returns their ids. Never mutates a run.
    pub async fn stalled_paused_runs(
        &self,
        max_age: chrono::Duration,
    ) -> Result<Vec<RunId>, IngestError> {
        let cutoff = Utc::now() - max_age;
        let stalled = self.runs.find_paused_before(cutoff).await?;
        for run in &stalled {
            tracing::warn!(
                run_id = %run.id,
                workflow = %run.workflow_id,
                expected_event = run.expected_event.as_deref().unwrap_or(""),
                started_at = %run.started_at,
                "run paused past the stall threshold"
            );
        }
        Ok(stalled.into_iter().map(|r| r.id).collect())
    }
}
