//! # plancanvas core
//!
//! Domain types, traits, and error definitions for the plancanvas
//! plan-execute-replan agent. This crate has **no framework dependencies**:
//! it defines the domain model that all other crates implement against.
//!
//! Every collaborator of the agent loop is a trait here:
//! - [`CanvasRepository`]: the node/edge graph under construction
//! - [`Tool`]: a canvas mutation the executor can invoke
//! - [`Provider`]: the external reasoning service

pub mod canvas;
pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use canvas::{CanvasRepository, CanvasState, Edge, Node};
pub use error::{Error, Result};
pub use message::{Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
