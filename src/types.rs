//! Core identifier and status types shared across the engine.
//!
//! This module defines the vocabulary the rest of the crate speaks:
//! opaque identifiers for definitions, runs, and nodes, plus the run
//! status state machine.
//!
//! # Key Types
//!
//! - [`RunStatus`]: lifecycle state of a [`WorkflowRun`](crate::run::WorkflowRun)
//! - [`WorkflowId`], [`RunId`], [`NodeId`]: opaque string identifiers
//!
//! Identifiers are plain strings: definitions arrive from an authoring
//! surface that assigns its own node ids, and the stores assign UUIDs for
//! workflow and run ids.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a workflow definition.
pub type WorkflowId = String;

/// Opaque identifier of a workflow run.
pub type RunId = String;

/// Identifier of a node within one definition's graph.
pub type NodeId = String;

/// Lifecycle state of a workflow run.
///
/// The transitions form a small state machine:
///
/// ```text
/// Running --(WAIT node reached)-->   Paused
/// Paused  --(matching event)-->      Running
/// Running --(END node reached)-->    Success
/// Running | Paused --(dispatch failure)--> Error
/// ```
///
/// `Success` and `Error` are terminal; no transition leaves them.
///
/// # Persistence
///
/// `RunStatus` supports serde for JSON shapes and
/// [`encode`](Self::encode)/[`decode`](Self::decode) for flat column
/// storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// The run is actively traversing the graph.
    Running,
    /// The run is suspended on a WAIT node until its expected event arrives.
    Paused,
    /// The run reached an END node.
    Success,
    /// A command dispatch failed; the run is terminally failed.
    Error,
}

impl RunStatus {
    /// Encode into the persisted string form.
    #[must_use]
    pub fn encode(&self) -> &'static str {
        match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Paused => "PAUSED",
            RunStatus::Success => "SUCCESS",
            RunStatus::Error => "ERROR",
        }
    }

    /// Decode a persisted string form back into a status.
    ///
    /// Unknown strings decode to `None` so callers can surface a backend
    /// error instead of guessing.
    #[must_use]
    pub fn decode(s: &str) -> Option<Self> {
        match s {
            "RUNNING" => Some(RunStatus::Running),
            "PAUSED" => Some(RunStatus::Paused),
            "SUCCESS" => Some(RunStatus::Success),
            "ERROR" => Some(RunStatus::Error),
            _ => None,
        }
    }

    /// Returns `true` for `Success` and `Error`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Error)
    }

    /// Returns `true` if the run is suspended awaiting an event.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        matches!(self, RunStatus::Paused)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}
