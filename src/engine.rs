//! The traversal engine: per-node semantics over a definition graph.
//!
//! Traversal is one *activation*: a synchronous walk (with async I/O at
//! dispatch and persistence points) that starts at a node, applies each
//! node type's semantics, and fans out along outgoing edges until the
//! worklist drains or the run reaches a terminal state. WAIT nodes split a
//! logical run into several activations over time; the persisted run
//! record (`last_node` + `expected_event`) is the only continuation.
//!
//! The walk uses an explicit worklist rather than recursion, so graph
//! depth never threatens the stack. A per-activation `visited` set
//! guards cycles and makes fan-in idempotent: a node reached along two
//! branches in one activation executes once. The set is deliberately not
//! carried across a pause/resume boundary — each activation starts
//! fresh, matching the upstream behavior boundary.
//!
//! Node semantics:
//!
//! | node | effect |
//! |---|---|
//! | TRIGGER | none; fan out |
//! | CONDITION | evaluate against run context; follow the matching `yes`/`no` edge only |
//! | WAIT | pause the run (`expected_event`, `last_node`); push nothing |
//! | ACTION | render payload, dispatch; failure is terminal `Error` and stops the activation |
//! | END | finalize `Success` once the worklist drains |
//!
//! A node id that does not resolve (dangling edge, or a definition
//! changed under a live run) drops that branch with a warning; a
//! malformed definition must not crash event processing.

use std::sync::Arc;

use chrono::Utc;
use miette::Diagnostic;
use rustc_hash::FxHashSet;
use thiserror::Error;
use tracing::instrument;

use crate::dispatch::{derive_queue, CommandDispatcher};
use crate::graph::{EdgeLabel, NodeSpec, WorkflowDefinition};
use crate::run::WorkflowRun;
use crate::store::{RunStore, StoreError};
use crate::template;
use crate::types::{NodeId, RunStatus};

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error(transparent)]
    #[diagnostic(code(eventweave::engine::store))]
    Store(#[from] StoreError),
}

/// Traversal engine over a run store and a command dispatcher.
///
/// The dispatcher (with its channel pool) and the store are injected and
/// shared across all activations; both are safe for concurrent use.
pub struct Engine {
    runs: Arc<dyn RunStore>,
    dispatcher: Arc<CommandDispatcher>,
}

impl Engine {
    #[must_use]
    pub fn new(runs: Arc<dyn RunStore>, dispatcher: Arc<CommandDispatcher>) -> Self {
        Self { runs, dispatcher }
    }

    /// Run one activation starting *at* `start` (used for freshly
    /// triggered runs), then persist the accumulated mutation.
    #[instrument(skip(self, definition, run), fields(run_id = %run.id), err)]
    pub async fn traverse(
        &self,
        definition: &WorkflowDefinition,
        run: &mut WorkflowRun,
        start: &str,
    ) -> Result<(), EngineError> {
        let visited = FxHashSet::default();
        let worklist = vec![start.to_string()];
        self.activate(definition, run, visited, worklist).await
    }

    /// Run one activation continuing *after* `wait_node` (used when a
    /// paused run resumes), then persist the accumulated mutation.
    ///
    /// The WAIT node itself is marked visited so the activation follows
    /// its outgoing edges instead of immediately pausing again.
    #[instrument(skip(self, definition, run), fields(run_id = %run.id), err)]
    pub async fn resume(
        &self,
        definition: &WorkflowDefinition,
        run: &mut WorkflowRun,
        wait_node: &str,
    ) -> Result<(), EngineError> {
        let mut visited = FxHashSet::default();
        visited.insert(wait_node.to_string());
        let mut worklist = Vec::new();
        push_outgoing(definition, wait_node, None, &mut worklist);
        self.activate(definition, run, visited, worklist).await
    }

    async fn activate(
        &self,
        definition: &WorkflowDefinition,
        run: &mut WorkflowRun,
        mut visited: FxHashSet<NodeId>,
        mut worklist: Vec<NodeId>,
    ) -> Result<(), EngineError> {
        let mut reached_end = false;

        while let Some(node_id) = worklist.pop() {
            if !visited.insert(node_id.clone()) {
                continue;
            }
            let Some(node) = definition.graph.node(&node_id) else {
                tracing::warn!(
                    workflow = %definition.id,
                    node = %node_id,
                    "node id does not resolve; dropping branch"
                );
                continue;
            };
            tracing::debug!(run_id = %run.id, node = %node_id, kind = node.kind(), "entering node");

            match node {
                NodeSpec::Trigger { .. } => {
                    push_outgoing(definition, &node_id, None, &mut worklist);
                }
                NodeSpec::Condition { expression, .. } => {
                    let label = if expression.holds(&run.context) {
                        EdgeLabel::Yes
                    } else {
                        EdgeLabel::No
                    };
                    let followed =
                        push_outgoing(definition, &node_id, Some(label), &mut worklist);
                    if followed == 0 {
                        tracing::debug!(
                            run_id = %run.id,
                            node = %node_id,
                            %label,
                            "no matching branch edge; dead end"
                        );
                    }
                }
                NodeSpec::Wait { event, .. } => {
                    run.status = RunStatus::Paused;
                    run.expected_event = Some(event.clone());
                    run.last_node = node_id.clone();
                    // Suspends this branch only; already-queued siblings
                    // keep going. Resumption is a fresh activation.
                }
                NodeSpec::Action {
                    pattern,
                    queue,
                    payload,
                    ..
                } => {
                    run.last_node = node_id.clone();
                    let rendered = template::render(payload, &run.context);
                    let queue = queue.clone().unwrap_or_else(|| derive_queue(pattern));
                    match self.dispatcher.dispatch(&queue, pattern, rendered).await {
                        Ok(()) => {
                            push_outgoing(definition, &node_id, None, &mut worklist);
                        }
                        Err(error) => {
                            tracing::warn!(
                                run_id = %run.id,
                                node = %node_id,
                                %queue,
                                %error,
                                "dispatch failed; failing run"
                            );
                            run.status = RunStatus::Error;
                            run.error = Some(error.to_string());
                            run.expected_event = None;
                            run.ended_at = Some(Utc::now());
                            worklist.clear();
                            break;
                        }
                    }
                }
                NodeSpec::End { .. } => {
                    reached_end = true;
                    push_outgoing(definition, &node_id, None, &mut worklist);
                }
            }
        }

        // END finalization wins over a pause recorded on a sibling branch,
        // but never over a dispatch failure.
        if reached_end && run.status != RunStatus::Error {
            run.status = RunStatus::Success;
            run.expected_event = None;
            run.ended_at = Some(Utc::now());
        }

        let updated = self
            .runs
            .update(&run.id, run.revision, run.as_update())
            .await?;
        *run = updated;
        Ok(())
    }
}

/// Push the targets of `source`'s outgoing edges, optionally filtered by
/// label. Returns how many edges matched.
///
/// Targets are pushed in reverse declaration order so the stack pops them
/// in declaration order.
fn push_outgoing(
    definition: &WorkflowDefinition,
    source: &str,
    label: Option<EdgeLabel>,
    worklist: &mut Vec<NodeId>,
) -> usize {
    let targets: Vec<&str> = definition
        .graph
        .outgoing(source)
        .filter(|edge| match label {
            Some(wanted) => edge.label == Some(wanted),
            None => true,
        })
        .map(|edge| edge.target.as_str())
        .collect();
    for target in targets.iter().rev() {
        worklist.push((*target).to_string());
    }
    targets.len()
}
