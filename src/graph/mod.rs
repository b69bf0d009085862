//! Workflow graph data model: definitions, nodes, edges, validation.
//!
//! A definition is a directed graph whose nodes carry per-type execution
//! semantics (see [`crate::engine`]) and whose edges carry optional branch
//! labels for CONDITION routing. Definitions are plain data: they serialize
//! to JSON for storage and never hold behavior.

pub mod definition;
pub mod node;

pub use definition::{GraphError, GraphSpec, WorkflowDefinition};
pub use node::{EdgeLabel, EdgeSpec, NodeSpec};
