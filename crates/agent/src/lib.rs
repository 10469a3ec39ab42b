//! The plan-execute-replan agent for plancanvas.
//!
//! Given a goal, the agent:
//!
//! 1. **Plans**: asks the reasoning service for an ordered list of steps
//! 2. **Executes** the first step with a tool-calling executor that edits
//!    the canvas through `add_node` / `connect_nodes`
//! 3. **Replans**: asks whether the goal is met; if not, the remaining
//!    steps replace the plan and execution continues
//!
//! Progress is reported as a stream of [`LoopEvent`]s.

pub mod plan_execute;
pub mod stream_event;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use plan_execute::{
    EVENT_CHANNEL_CAPACITY, LoopOutcome, LoopState, Phase, PlanExecuteAgent, ReplanDecision,
    StepResult,
};
pub use stream_event::{
    LoopEvent, NDJSON_CONTENT_TYPE, Source, TaskGroup, ToolCallState, ToolInvocation,
    ToolInvocationKind,
};
