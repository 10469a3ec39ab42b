//! `add_node`: place a new node on the canvas.

use async_trait::async_trait;
use plancanvas_core::canvas::{CanvasRepository, Node};
use plancanvas_core::error::ToolError;
use plancanvas_core::tool::{Tool, ToolResult};
use std::sync::Arc;

use crate::{required_str, storage_failure};

/// Appends a node with a freshly generated id. Never fails on valid input;
/// identical calls produce two distinct nodes.
pub struct AddNodeTool {
    canvas: Arc<dyn CanvasRepository>,
}

impl AddNodeTool {
    pub fn new(canvas: Arc<dyn CanvasRepository>) -> Self {
        Self { canvas }
    }
}

#[async_trait]
impl Tool for AddNodeTool {
    fn name(&self) -> &str {
        "add_node"
    }

    fn description(&self) -> &str {
        "Add a node to the canvas. Use type 'source' for inputs, 'process' for \
         transformations and 'sink' for outputs. Returns the new node's id."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "type": {
                    "type": "string",
                    "description": "Node type, e.g. source, process or sink"
                },
                "label": {
                    "type": "string",
                    "description": "Human-readable name used to refer to the node later"
                }
            },
            "required": ["type", "label"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let kind = required_str(&arguments, "type")?;
        let label = required_str(&arguments, "label")?;

        let node = Node::new(kind, label);
        let id = node.id.clone();
        self.canvas
            .add_node(node)
            .await
            .map_err(|e| storage_failure(self.name(), e))?;

        tracing::debug!(%id, label, "add_node");
        Ok(ToolResult::success(serde_json::json!({
            "status": "success",
            "msg": format!("Added node '{label}'"),
            "id": id,
        })))
    }
}
