//! Workflow definitions: a named, validated graph of nodes and edges.

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::node::{EdgeLabel, EdgeSpec, NodeSpec};
use crate::types::{NodeId, WorkflowId};

/// Structural errors detected by [`GraphSpec::validate`].
///
/// Validation runs once, when a definition enters a store. The traversal
/// engine still guards against dangling references defensively, since a
/// stored definition predating stricter validation must not crash the
/// ingestion loop.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("duplicate node id: {id}")]
    #[diagnostic(
        code(eventweave::graph::duplicate_node),
        help("Every node id must be unique within a definition.")
    )]
    DuplicateNodeId { id: NodeId },

    #[error("edge references unknown node: {from} -> {target}")]
    #[diagnostic(
        code(eventweave::graph::dangling_edge),
        help("Both edge endpoints must name an existing node id.")
    )]
    DanglingEdge { from: NodeId, target: NodeId },

    #[error("condition node {id} needs exactly one '{label}' edge, found {found}")]
    #[diagnostic(
        code(eventweave::graph::condition_branches),
        help("Label exactly one outgoing edge 'yes' and one 'no'.")
    )]
    ConditionBranch {
        id: NodeId,
        label: EdgeLabel,
        found: usize,
    },
}

/// The graph body of a definition: nodes plus directed edges.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphSpec {
    pub nodes: Vec<NodeSpec>,
    pub edges: Vec<EdgeSpec>,
}

impl GraphSpec {
    #[must_use]
    pub fn new(nodes: Vec<NodeSpec>, edges: Vec<EdgeSpec>) -> Self {
        Self { nodes, edges }
    }

    /// Check the structural invariants: unique node ids, resolvable edge
    /// endpoints, and exactly one `yes`/`no` edge per CONDITION node.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for node in &self.nodes {
            if !seen.insert(node.id()) {
                return Err(GraphError::DuplicateNodeId {
                    id: node.id().to_string(),
                });
            }
        }

        for edge in &self.edges {
            if !seen.contains(edge.source.as_str()) || !seen.contains(edge.target.as_str()) {
                return Err(GraphError::DanglingEdge {
                    from: edge.source.clone(),
                    target: edge.target.clone(),
                });
            }
        }

        for node in &self.nodes {
            if let NodeSpec::Condition { id, .. } = node {
                for label in [EdgeLabel::Yes, EdgeLabel::No] {
                    let found = self
                        .outgoing(id)
                        .filter(|e| e.label == Some(label))
                        .count();
                    if found != 1 {
                        return Err(GraphError::ConditionBranch {
                            id: id.clone(),
                            label,
                            found,
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    /// All edges leaving `id`, in declaration order.
    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a EdgeSpec> {
        self.edges.iter().filter(move |e| e.source == id)
    }

    /// TRIGGER nodes matching a domain event name.
    pub fn triggers_for<'a>(&'a self, event: &'a str) -> impl Iterator<Item = &'a NodeSpec> {
        self.nodes.iter().filter(move |n| {
            matches!(n, NodeSpec::Trigger { event: e, .. } if e.as_str() == event)
        })
    }
}

/// A stored workflow definition.
///
/// Definitions are created by an authoring surface and read-only to the
/// engine; a run's `last_node` is only meaningful against the definition
/// as it existed when the run referenced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: WorkflowId,
    pub name: String,
    pub published: bool,
    pub graph: GraphSpec,
    pub created_at: DateTime<Utc>,
}

impl WorkflowDefinition {
    /// Build a fresh unpublished definition with a generated id.
    #[must_use]
    pub fn new(name: impl Into<String>, graph: GraphSpec) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            published: false,
            graph,
            created_at: Utc::now(),
        }
    }
}
