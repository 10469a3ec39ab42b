//! `connect_nodes`: draw an edge between two existing nodes by label.

use async_trait::async_trait;
use plancanvas_core::canvas::{CanvasRepository, Edge};
use plancanvas_core::error::ToolError;
use plancanvas_core::tool::{Tool, ToolResult};
use std::sync::Arc;

use crate::{required_str, storage_failure};

/// Looks both labels up case-insensitively (first match wins) and appends
/// one edge. An unknown label is a failed result, not an error, so the
/// model can read it and correct itself.
pub struct ConnectNodesTool {
    canvas: Arc<dyn CanvasRepository>,
}

impl ConnectNodesTool {
    pub fn new(canvas: Arc<dyn CanvasRepository>) -> Self {
        Self { canvas }
    }
}

#[async_trait]
impl Tool for ConnectNodesTool {
    fn name(&self) -> &str {
        "connect_nodes"
    }

    fn description(&self) -> &str {
        "Connect two nodes that are already on the canvas, referring to them by label. \
         Labels are matched case-insensitively."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "source_label": {
                    "type": "string",
                    "description": "Label of the node the edge starts from"
                },
                "target_label": {
                    "type": "string",
                    "description": "Label of the node the edge points to"
                }
            },
            "required": ["source_label", "target_label"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let source_label = required_str(&arguments, "source_label")?;
        let target_label = required_str(&arguments, "target_label")?;

        let state = self
            .canvas
            .get_state()
            .await
            .map_err(|e| storage_failure(self.name(), e))?;

        let Some(source) = state.find_by_label(source_label) else {
            return Ok(ToolResult::failure(format!(
                "Error: Source node '{source_label}' not found."
            )));
        };
        let Some(target) = state.find_by_label(target_label) else {
            return Ok(ToolResult::failure(format!(
                "Error: Target node '{target_label}' not found."
            )));
        };

        let edge = Edge {
            source: source.id.clone(),
            target: target.id.clone(),
        };
        self.canvas
            .add_edge(edge)
            .await
            .map_err(|e| storage_failure(self.name(), e))?;

        tracing::debug!(source_label, target_label, "connect_nodes");
        Ok(ToolResult::success(serde_json::json!({
            "status": "success",
            "msg": format!("Connected {source_label} to {target_label}"),
        })))
    }
}
