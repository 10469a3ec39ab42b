//! In-memory canvas: the store used for sessions and tests.

use async_trait::async_trait;
use plancanvas_core::canvas::{CanvasRepository, CanvasState, Edge, Node};
use plancanvas_core::error::CanvasError;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A canvas held in process memory.
///
/// Clones share the same underlying state.
#[derive(Clone)]
pub struct InMemoryCanvas {
    state: Arc<RwLock<CanvasState>>,
}

impl InMemoryCanvas {
    pub fn new() -> Self {
        Self::from_state(CanvasState::default())
    }

    /// Start from an existing snapshot.
    pub fn from_state(state: CanvasState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }
}

impl Default for InMemoryCanvas {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CanvasRepository for InMemoryCanvas {
    fn name(&self) -> &str { "in_memory" }

    async fn get_state(&self) -> Result<CanvasState, CanvasError> {
        Ok(self.state.read().await.clone())
    }

    async fn add_node(&self, node: Node) -> Result<(), CanvasError> {
        tracing::debug!(id = %node.id, label = %node.label, "canvas: add node");
        self.state.write().await.nodes.push(node);
        Ok(())
    }

    async fn add_edge(&self, edge: Edge) -> Result<(), CanvasError> {
        tracing::debug!(from = %edge.source, to = %edge.target, "canvas: add edge");
        self.state.write().await.edges.push(edge);
        Ok(())
    }
}
