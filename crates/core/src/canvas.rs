//! Canvas trait: the node/edge graph the agent builds.
//!
//! A canvas is the central shared resource of a session. The executor's
//! tools append to it, and every planner/executor/replanner prompt embeds
//! a JSON snapshot of it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::CanvasError;

/// A node on the canvas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Generated, unique within a canvas
    pub id: String,

    /// Free-form tag (e.g. "source", "process", "sink")
    #[serde(rename = "type")]
    pub kind: String,

    /// Free-form name, looked up case-insensitively
    pub label: String,
}

impl Node {
    /// Create a node with a fresh UUID.
    pub fn new(kind: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: kind.into(),
            label: label.into(),
        }
    }
}

/// A directed edge between two node ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

/// A point-in-time snapshot of a canvas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasState {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl CanvasState {
    /// First node whose label matches, ignoring case.
    ///
    /// Duplicate labels are allowed; the earliest inserted node wins.
    pub fn find_by_label(&self, label: &str) -> Option<&Node> {
        let wanted = label.to_lowercase();
        self.nodes.iter().find(|n| n.label.to_lowercase() == wanted)
    }
}

/// The canvas storage abstraction.
///
/// Appends are unchecked: `add_node` does not dedup ids and `add_edge` does
/// not validate that its endpoints exist. Validation, where wanted, belongs
/// to the tool layer.
#[async_trait]
pub trait CanvasRepository: Send + Sync {
    /// A human-readable name for this backend (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Read a snapshot of the current state.
    async fn get_state(&self) -> Result<CanvasState, CanvasError>;

    /// Append a node.
    async fn add_node(&self, node: Node) -> Result<(), CanvasError>;

    /// Append an edge.
    async fn add_edge(&self, edge: Edge) -> Result<(), CanvasError>;

    /// Look up a node by label in the current snapshot.
    async fn find_by_label(&self, label: &str) -> Result<Option<Node>, CanvasError> {
        Ok(self.get_state().await?.find_by_label(label).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, label: &str) -> Node {
        Node {
            id: id.into(),
            kind: "process".into(),
            label: label.into(),
        }
    }

    #[test]
    fn node_serializes_kind_as_type() {
        let json = serde_json::to_value(node("n1", "Filter")).unwrap();
        assert_eq!(json["type"], "process");
        assert_eq!(json["label"], "Filter");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn new_nodes_get_distinct_ids() {
        let a = Node::new("source", "A");
        let b = Node::new("source", "A");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn label_lookup_ignores_case() {
        let state = CanvasState {
            nodes: vec![node("n1", "Twitter")],
            edges: vec![],
        };
        assert_eq!(state.find_by_label("twitter").unwrap().id, "n1");
        assert_eq!(state.find_by_label("TWITTER").unwrap().id, "n1");
        assert!(state.find_by_label("Database").is_none());
    }

    #[test]
    fn duplicate_labels_resolve_to_first_match() {
        let state = CanvasState {
            nodes: vec![node("first", "Sink"), node("second", "sink")],
            edges: vec![],
        };
        assert_eq!(state.find_by_label("SINK").unwrap().id, "first");
    }

    #[test]
    fn empty_state_serializes_to_empty_lists() {
        let json = serde_json::to_string(&CanvasState::default()).unwrap();
        assert_eq!(json, r#"{"nodes":[],"edges":[]}"#);
    }
}
