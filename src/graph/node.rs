//! Node and edge shapes of a workflow graph.
//!
//! Unlike an in-process task graph, these nodes are *data*: definitions are
//! authored elsewhere, stored as JSON, and interpreted by the traversal
//! engine. The tagged-union wire form uses the upstream vocabulary
//! (`TRIGGER`, `CONDITION`, `WAIT`, `ACTION`, `END`).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::condition::Condition;
use crate::types::NodeId;

/// One node of a workflow graph.
///
/// # Examples
///
/// ```
/// use eventweave::graph::NodeSpec;
///
/// let node: NodeSpec = serde_json::from_value(serde_json::json!({
///     "type": "TRIGGER",
///     "id": "t1",
///     "event": "order.created",
/// })).unwrap();
/// assert_eq!(node.id(), "t1");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeSpec {
    /// Entry point; a run is created when a domain event with this name
    /// arrives and the owning definition is published.
    #[serde(rename = "TRIGGER")]
    Trigger { id: NodeId, event: String },

    /// Boolean branch point. Must have exactly one outgoing `yes` edge and
    /// one outgoing `no` edge.
    #[serde(rename = "CONDITION")]
    Condition { id: NodeId, expression: Condition },

    /// Suspends the run until a domain event named `event` arrives.
    #[serde(rename = "WAIT")]
    Wait { id: NodeId, event: String },

    /// Fire-and-forget command dispatch. `queue` defaults to a name derived
    /// from the first dot-segment of `pattern`.
    #[serde(rename = "ACTION")]
    Action {
        id: NodeId,
        pattern: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        queue: Option<String>,
        #[serde(default)]
        payload: Value,
    },

    /// Terminal success marker.
    #[serde(rename = "END")]
    End { id: NodeId },
}

impl NodeSpec {
    /// The node's identifier within its definition.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            NodeSpec::Trigger { id, .. }
            | NodeSpec::Condition { id, .. }
            | NodeSpec::Wait { id, .. }
            | NodeSpec::Action { id, .. }
            | NodeSpec::End { id } => id,
        }
    }

    /// Short kind label for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            NodeSpec::Trigger { .. } => "TRIGGER",
            NodeSpec::Condition { .. } => "CONDITION",
            NodeSpec::Wait { .. } => "WAIT",
            NodeSpec::Action { .. } => "ACTION",
            NodeSpec::End { .. } => "END",
        }
    }
}

/// Branch label on an edge leaving a CONDITION node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeLabel {
    Yes,
    No,
}

impl fmt::Display for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeLabel::Yes => write!(f, "yes"),
            EdgeLabel::No => write!(f, "no"),
        }
    }
}

/// A directed edge between two nodes.
///
/// `label` is only meaningful when leaving a CONDITION node; it is ignored
/// everywhere else.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<EdgeLabel>,
}

impl EdgeSpec {
    /// Unlabeled edge.
    #[must_use]
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            label: None,
        }
    }

    /// Labeled edge (for CONDITION branches).
    #[must_use]
    pub fn labeled(
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        label: EdgeLabel,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            label: Some(label),
        }
    }
}
