//! Canvas tools for plancanvas.
//!
//! The executor acts on a session's canvas through exactly two tools:
//! `add_node` and `connect_nodes`. Both are bound to one canvas when the
//! registry is built.

pub mod add_node;
pub mod connect_nodes;

use plancanvas_core::canvas::CanvasRepository;
use plancanvas_core::error::{CanvasError, ToolError};
use plancanvas_core::tool::ToolRegistry;
use std::sync::Arc;

pub use add_node::AddNodeTool;
pub use connect_nodes::ConnectNodesTool;

/// Create a tool registry whose tools all act on `canvas`.
pub fn canvas_registry(canvas: Arc<dyn CanvasRepository>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(AddNodeTool::new(canvas.clone())));
    registry.register(Box::new(ConnectNodesTool::new(canvas)));
    registry
}

fn required_str<'a>(arguments: &'a serde_json::Value, key: &str) -> Result<&'a str, ToolError> {
    arguments[key]
        .as_str()
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

fn storage_failure(tool_name: &str, err: CanvasError) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: tool_name.to_string(),
        reason: err.to_string(),
    }
}
