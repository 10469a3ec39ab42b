//! Loop progress events and their NDJSON encoding.
//!
//! A run of the plan-execute-replan loop is reported to the consumer as a
//! sequence of `LoopEvent`s, one JSON object per line, discriminated by
//! `type`. A successful run ends with `canvas` then `done`; a failed run
//! ends with a single `error`.

use plancanvas_core::canvas::CanvasState;
use serde::{Deserialize, Serialize};

/// Content type of an encoded event stream.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Title of the plan overview carried by `tasks` events.
pub const PLAN_TITLE: &str = "Execution Plan";

/// Prefix marking completed steps in a plan overview.
pub const COMPLETED_MARK: &str = "✅ ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoopEvent {
    /// Role-tagged progress text (`[Planner] ...`).
    ReasoningChunk { text: String },

    /// The current plan overview.
    Tasks { data: Vec<TaskGroup> },

    /// A tool invocation or its outcome.
    ToolCall { tool: ToolInvocation },

    /// Final answer text.
    ContentChunk { text: String },

    /// Cited sources. Part of the wire vocabulary; the loop never emits it.
    Sources { data: Vec<Source> },

    /// Canvas snapshot, sent once before `done`.
    Canvas { data: CanvasState },

    Done,

    /// Terminal failure; nothing follows it.
    Error { message: String },
}

impl LoopEvent {
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self::ReasoningChunk { text: text.into() }
    }

    /// A `tasks` event listing completed steps (marked) then pending ones.
    pub fn plan_overview<'a>(
        completed: impl IntoIterator<Item = &'a str>,
        pending: &[String],
    ) -> Self {
        let items = completed
            .into_iter()
            .map(|step| format!("{COMPLETED_MARK}{step}"))
            .chain(pending.iter().cloned())
            .collect();
        Self::Tasks {
            data: vec![TaskGroup {
                title: PLAN_TITLE.into(),
                items,
            }],
        }
    }

    /// Wire name of this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ReasoningChunk { .. } => "reasoning_chunk",
            Self::Tasks { .. } => "tasks",
            Self::ToolCall { .. } => "tool_call",
            Self::ContentChunk { .. } => "content_chunk",
            Self::Sources { .. } => "sources",
            Self::Canvas { .. } => "canvas",
            Self::Done => "done",
            Self::Error { .. } => "error",
        }
    }

    /// Encode as one NDJSON line, newline included.
    pub fn to_ndjson(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskGroup {
    pub title: String,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolInvocationKind {
    ToolCall,
    ToolResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolCallState {
    InputAvailable,
    OutputAvailable,
    OutputError,
}

/// One side of a tool call as the front-end sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    #[serde(rename = "type")]
    pub kind: ToolInvocationKind,
    pub tool_call_id: String,
    pub tool_name: String,
    #[serde(alias = "input")]
    pub args: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    pub state: ToolCallState,
}

impl ToolInvocation {
    /// The call as requested, before it runs.
    pub fn requested(id: &str, name: &str, args: serde_json::Value) -> Self {
        Self {
            kind: ToolInvocationKind::ToolCall,
            tool_call_id: id.to_string(),
            tool_name: name.to_string(),
            args,
            result: None,
            state: ToolCallState::InputAvailable,
        }
    }

    /// The outcome of a call; `success == false` marks `output-error`.
    pub fn finished(
        id: &str,
        name: &str,
        args: serde_json::Value,
        output: impl Into<String>,
        success: bool,
    ) -> Self {
        Self {
            kind: ToolInvocationKind::ToolResult,
            tool_call_id: id.to_string(),
            tool_name: name.to_string(),
            args,
            result: Some(output.into()),
            state: if success {
                ToolCallState::OutputAvailable
            } else {
                ToolCallState::OutputError
            },
        }
    }
}
