//! Plan-execute-replan loop.
//!
//! ```text
//! Plan ──▶ Execute ──▶ Replan ──▶ Done
//!             ▲           │
//!             └───────────┘  (no response yet)
//! ```
//!
//! - **Plan**: the planner turns the goal into steps.
//! - **Execute**: the executor runs the FIRST step only. The step stays in
//!   the plan; the replanner is responsible for returning what remains.
//!   An empty plan is a no-op.
//! - **Replan**: a non-blank response finishes the run and clears the plan;
//!   otherwise the returned steps replace the plan.
//!
//! Every phase reports progress as [`LoopEvent`]s. Any provider, canvas or
//! parse failure aborts the run.

pub mod executor;
pub mod planner;
pub mod replanner;
pub mod structured;

use plancanvas_config::AppConfig;
use plancanvas_core::canvas::{CanvasRepository, CanvasState};
use plancanvas_core::error::AgentError;
use plancanvas_core::message::Message;
use plancanvas_core::provider::{Provider, ProviderRequest};
use plancanvas_core::tool::ToolRegistry;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::stream_event::LoopEvent;
pub use replanner::ReplanDecision;

/// Capacity of the event channel between a running loop and its consumer.
pub const EVENT_CHANNEL_CAPACITY: usize = 128;

/// Where the loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Plan,
    Execute,
    Replan,
    Done,
}

/// One executed step and what the executor said about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepResult {
    pub step: String,
    pub output: String,
}

/// Per-request loop state. Discarded once the run ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopState {
    pub goal: String,
    pub plan: Vec<String>,
    /// Append-only.
    pub history: Vec<StepResult>,
    pub response: Option<String>,
}

impl LoopState {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            ..Self::default()
        }
    }

    /// Apply a replanner verdict and return the next phase.
    pub fn apply(&mut self, decision: ReplanDecision) -> Phase {
        match decision.response {
            Some(response) if !response.trim().is_empty() => {
                self.plan.clear();
                self.response = Some(response);
                Phase::Done
            }
            _ => {
                self.plan = decision.plan.unwrap_or_default();
                Phase::Execute
            }
        }
    }

    fn completed_steps(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(|h| h.step.as_str())
    }
}

/// The result of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct LoopOutcome {
    pub response: String,
    pub canvas: CanvasState,
    pub history: Vec<StepResult>,
    /// Replan rounds taken.
    pub rounds: u32,
}

/// The plan-execute-replan agent, bound to one canvas.
#[derive(Clone)]
pub struct PlanExecuteAgent {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    tools: Arc<ToolRegistry>,
    canvas: Arc<dyn CanvasRepository>,
    max_rounds: u32,
    max_tool_iterations: usize,
}

impl PlanExecuteAgent {
    /// Create an agent whose executor acts on `canvas` through the canvas tools.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        canvas: Arc<dyn CanvasRepository>,
    ) -> Self {
        let tools = plancanvas_tools::canvas_registry(canvas.clone());
        Self {
            provider,
            model: model.into(),
            temperature: 0.2,
            max_tokens: None,
            tools: Arc::new(tools),
            canvas,
            max_rounds: 25,
            max_tool_iterations: 8,
        }
    }

    /// Create an agent with the model, sampling and limits from `config`.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        canvas: Arc<dyn CanvasRepository>,
    ) -> Self {
        Self::new(provider, &config.default_model, canvas)
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens)
            .with_max_rounds(config.agent.max_rounds)
            .with_max_tool_iterations(config.agent.max_tool_iterations)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the default max tokens per LLM response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set the replan-round limit. Clamped to at least 1.
    pub fn with_max_rounds(mut self, max: u32) -> Self {
        self.max_rounds = max.max(1);
        self
    }

    /// Set the executor's tool-calling turn limit per step. Clamped to at least 1.
    pub fn with_max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = max.max(1);
        self
    }

    pub fn canvas(&self) -> &Arc<dyn CanvasRepository> {
        &self.canvas
    }

    /// Run the loop for `goal`, reporting progress on `tx`.
    ///
    /// On success the last events sent are `content_chunk`, `canvas` and
    /// `done`. On failure nothing terminal is sent; see [`Self::forward`].
    pub async fn run(
        &self,
        goal: &str,
        tx: &mpsc::Sender<LoopEvent>,
    ) -> plancanvas_core::Result<LoopOutcome> {
        info!(model = %self.model, max_rounds = self.max_rounds, "plan-execute loop starting");

        let mut state = LoopState::new(goal);
        let mut phase = Phase::Plan;
        let mut rounds = 0u32;

        while phase != Phase::Done {
            phase = match phase {
                Phase::Plan => {
                    emit(tx, LoopEvent::reasoning("[Planner] Creating plan based on request...\n")).await;
                    state.plan = self.plan_steps(&state.goal).await?;
                    info!(steps = state.plan.len(), "plan created");
                    emit(
                        tx,
                        LoopEvent::reasoning(format!(
                            "[Planner] Plan created with {} steps.\n",
                            state.plan.len()
                        )),
                    )
                    .await;
                    emit(tx, LoopEvent::plan_overview(state.completed_steps(), &state.plan)).await;
                    Phase::Execute
                }
                Phase::Execute => {
                    match state.plan.first().cloned() {
                        None => {
                            emit(tx, LoopEvent::reasoning("[Executor] No steps left in plan.\n")).await;
                        }
                        Some(step) => {
                            info!(%step, "executing step");
                            emit(tx, LoopEvent::reasoning(format!("[Executor] Executing step: '{step}'\n"))).await;
                            let output = self.execute_step(&step, tx).await?;
                            state.history.push(StepResult { step, output });
                        }
                    }
                    Phase::Replan
                }
                Phase::Replan => {
                    rounds += 1;
                    emit(tx, LoopEvent::reasoning("[Replanner] Reviewing progress...\n")).await;
                    let decision = self.replan(&state).await?;
                    let next = state.apply(decision);
                    if next == Phase::Execute {
                        if rounds >= self.max_rounds {
                            warn!(rounds, "replanner never produced a response");
                            return Err(AgentError::RoundLimit(self.max_rounds).into());
                        }
                        info!(remaining = state.plan.len(), round = rounds, "plan updated");
                        emit(tx, LoopEvent::plan_overview(state.completed_steps(), &state.plan)).await;
                    }
                    next
                }
                Phase::Done => Phase::Done,
            };
        }

        let response = state.response.unwrap_or_default();
        let canvas = self.canvas.get_state().await?;
        info!(rounds, steps = state.history.len(), "plan-execute loop finished");

        emit(tx, LoopEvent::ContentChunk { text: response.clone() }).await;
        emit(tx, LoopEvent::Canvas { data: canvas.clone() }).await;
        emit(tx, LoopEvent::Done).await;

        Ok(LoopOutcome {
            response,
            canvas,
            history: state.history,
            rounds,
        })
    }

    /// Like [`Self::run`], but a failure is also reported as a terminal
    /// `error` event.
    pub async fn forward(
        &self,
        goal: &str,
        tx: &mpsc::Sender<LoopEvent>,
    ) -> plancanvas_core::Result<LoopOutcome> {
        let result = self.run(goal, tx).await;
        if let Err(e) = &result {
            warn!(error = %e, "plan-execute loop failed");
            emit(tx, LoopEvent::Error { message: e.to_string() }).await;
        }
        result
    }

    /// Run the loop on a background task and return its event stream.
    pub fn run_stream(&self, goal: impl Into<String>) -> mpsc::Receiver<LoopEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let agent = self.clone();
        let goal = goal.into();
        tokio::spawn(async move {
            let _ = agent.forward(&goal, &tx).await;
        });
        rx
    }

    fn request(&self, messages: Vec<Message>) -> ProviderRequest {
        ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: Vec::new(),
            json_output: false,
        }
    }

    async fn canvas_json(&self) -> plancanvas_core::Result<String> {
        let state = self.canvas.get_state().await?;
        Ok(serde_json::to_string(&state)?)
    }
}

/// Send an event, ignoring a consumer that has gone away.
///
/// A disconnected consumer does not stop the loop; the canvas still ends
/// up consistent.
pub(crate) async fn emit(tx: &mpsc::Sender<LoopEvent>, event: LoopEvent) {
    let _ = tx.send(event).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream_event::ToolCallState;
    use crate::test_helpers::*;
    use plancanvas_canvas::InMemoryCanvas;
    use plancanvas_core::error::Error;

    const GOAL: &str = "add a node A of type source and node B of type sink, connect A to B";

    fn agent(provider: Arc<SequentialMockProvider>) -> (PlanExecuteAgent, Arc<InMemoryCanvas>) {
        let canvas = Arc::new(InMemoryCanvas::new());
        (PlanExecuteAgent::new(provider, "mock-model", canvas.clone()), canvas)
    }

    async fn drain(mut rx: mpsc::Receiver<LoopEvent>) -> Vec<LoopEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn reasoning_texts(events: &[LoopEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|e| match e {
                LoopEvent::ReasoningChunk { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn blank_response_keeps_going() {
        let mut state = LoopState::new("g");
        let next = state.apply(ReplanDecision {
            response: Some("   ".into()),
            plan: Some(vec!["next".into()]),
        });
        assert_eq!(next, Phase::Execute);
        assert_eq!(state.plan, vec!["next"]);
        assert!(state.response.is_none());
    }

    #[test]
    fn missing_plan_means_empty_plan() {
        let mut state = LoopState::new("g");
        state.plan = vec!["old".into()];
        assert_eq!(state.apply(ReplanDecision::default()), Phase::Execute);
        assert!(state.plan.is_empty());
    }

    #[test]
    fn response_finishes_and_clears_plan() {
        let mut state = LoopState::new("g");
        state.plan = vec!["leftover".into()];
        let next = state.apply(ReplanDecision {
            response: Some("All done".into()),
            plan: Some(vec!["ignored".into()]),
        });
        assert_eq!(next, Phase::Done);
        assert!(state.plan.is_empty());
        assert_eq!(state.response.as_deref(), Some("All done"));
    }

    #[tokio::test]
    async fn builds_two_nodes_and_an_edge() {
        let provider = Arc::new(SequentialMockProvider::new(two_node_script()));
        let (agent, canvas) = agent(provider.clone());

        let events = drain(agent.run_stream(GOAL)).await;

        let state = canvas.get_state().await.unwrap();
        assert_eq!(state.nodes.len(), 2);
        let a = state.find_by_label("A").unwrap();
        let b = state.find_by_label("B").unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.kind, "source");
        assert_eq!(b.kind, "sink");
        assert_eq!(state.edges.len(), 1);
        assert_eq!(state.edges[0].source, a.id);
        assert_eq!(state.edges[0].target, b.id);

        assert_eq!(provider.call_count(), 7);
        assert!(matches!(events.last(), Some(LoopEvent::Done)));
        match &events[events.len() - 2] {
            LoopEvent::Canvas { data } => assert_eq!(data, &state),
            other => panic!("expected canvas before done, got {other:?}"),
        }
        match &events[events.len() - 3] {
            LoopEvent::ContentChunk { text } => assert!(text.contains("connected")),
            other => panic!("expected content before canvas, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reports_phases_in_order() {
        let provider = Arc::new(SequentialMockProvider::new(two_node_script()));
        let (agent, _) = agent(provider);

        let events = drain(agent.run_stream(GOAL)).await;
        assert_eq!(
            reasoning_texts(&events),
            vec![
                "[Planner] Creating plan based on request...\n",
                "[Planner] Plan created with 2 steps.\n",
                "[Executor] Executing step: 'Add node A of type source'\n",
                "[Replanner] Reviewing progress...\n",
                "[Executor] Executing step: 'Add node B of type sink and connect A to B'\n",
                "[Replanner] Reviewing progress...\n",
            ]
        );

        let tasks: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                LoopEvent::Tasks { data } => Some(data[0].items.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            tasks,
            vec![
                vec![
                    "Add node A of type source".to_string(),
                    "Add node B of type sink and connect A to B".to_string(),
                ],
                vec![
                    "✅ Add node A of type source".to_string(),
                    "Add node B of type sink and connect A to B".to_string(),
                ],
            ]
        );

        let tool_states: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                LoopEvent::ToolCall { tool } => Some((tool.tool_name.as_str(), tool.state)),
                _ => None,
            })
            .collect();
        assert_eq!(
            tool_states,
            vec![
                ("add_node", ToolCallState::InputAvailable),
                ("add_node", ToolCallState::OutputAvailable),
                ("add_node", ToolCallState::InputAvailable),
                ("add_node", ToolCallState::OutputAvailable),
                ("connect_nodes", ToolCallState::InputAvailable),
                ("connect_nodes", ToolCallState::OutputAvailable),
            ]
        );
    }

    #[tokio::test]
    async fn executes_only_the_first_step_per_round() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            text_response(&plan_json(&["one", "two", "three"])),
            text_response("did one"),
            text_response(&finish_json("stopping early")),
        ]));
        let (agent, _) = agent(provider.clone());
        let (tx, _rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let outcome = agent.run("g", &tx).await.unwrap();
        assert_eq!(
            outcome.history,
            vec![StepResult { step: "one".into(), output: "did one".into() }]
        );
        assert_eq!(outcome.rounds, 1);
        assert_eq!(provider.call_count(), 3);

        let replan_request = &provider.requests()[2];
        assert!(replan_request.json_output);
        assert!(replan_request.messages[1].content.contains("1. one\n2. two\n3. three\n"));
    }

    #[tokio::test]
    async fn empty_plan_skips_execution() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            text_response(&plan_json(&[])),
            text_response(&finish_json("Nothing to do")),
        ]));
        let (agent, _) = agent(provider.clone());

        let events = drain(agent.run_stream("g")).await;
        assert_eq!(provider.call_count(), 2);
        assert!(reasoning_texts(&events).contains(&"[Executor] No steps left in plan.\n"));
        assert!(!events.iter().any(|e| matches!(e, LoopEvent::ToolCall { .. })));
        assert!(matches!(events.last(), Some(LoopEvent::Done)));
    }

    #[tokio::test]
    async fn empty_plan_leaves_no_history() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            text_response(&plan_json(&[])),
            text_response(&finish_json("Nothing to do")),
        ]));
        let (agent, _) = agent(provider);
        let (tx, _rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let outcome = agent.run("g", &tx).await.unwrap();
        assert!(outcome.history.is_empty());
        assert_eq!(outcome.response, "Nothing to do");
    }

    #[tokio::test]
    async fn failed_tool_call_is_reported_not_fatal() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            text_response(&plan_json(&["Connect X to Y"])),
            tool_call_response(vec![tool_call(
                "call_1",
                "connect_nodes",
                serde_json::json!({"source_label": "X", "target_label": "Y"}),
            )]),
            text_response("X does not exist"),
            text_response(&finish_json("Could not connect X to Y")),
        ]));
        let (agent, canvas) = agent(provider.clone());

        let events = drain(agent.run_stream("g")).await;
        let result = events
            .iter()
            .find_map(|e| match e {
                LoopEvent::ToolCall { tool } if tool.result.is_some() => Some(tool.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(result.state, ToolCallState::OutputError);
        assert_eq!(result.result.as_deref(), Some("Error: Source node 'X' not found."));
        assert!(canvas.get_state().await.unwrap().edges.is_empty());
        assert!(matches!(events.last(), Some(LoopEvent::Done)));

        let followup = &provider.requests()[2];
        let tool_message = followup.messages.last().unwrap();
        assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(tool_message.content, "Error: Source node 'X' not found.");
    }

    #[tokio::test]
    async fn invalid_tool_arguments_are_not_fatal() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            text_response(&plan_json(&["Add a node"])),
            tool_call_response(vec![tool_call("call_1", "add_node", serde_json::json!({}))]),
            text_response("could not add"),
            text_response(&finish_json("done")),
        ]));
        let (agent, _) = agent(provider);
        let (tx, _rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let outcome = agent.run("g", &tx).await.unwrap();
        assert_eq!(outcome.history[0].output, "could not add");
    }

    #[tokio::test]
    async fn unparsable_tool_arguments_are_reported() {
        let mut bad_call = tool_call("call_1", "add_node", serde_json::json!({}));
        bad_call.arguments = r#"{"type": "source", "label": "A""#.into();
        let provider = Arc::new(SequentialMockProvider::new(vec![
            text_response(&plan_json(&["Add A"])),
            tool_call_response(vec![bad_call]),
            text_response("arguments were broken"),
            text_response(&finish_json("done")),
        ]));
        let (agent, canvas) = agent(provider.clone());

        let events = drain(agent.run_stream("g")).await;
        let result = events
            .iter()
            .find_map(|e| match e {
                LoopEvent::ToolCall { tool } if tool.result.is_some() => Some(tool.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(result.state, ToolCallState::OutputError);
        assert!(result.result.as_deref().unwrap().starts_with("Error: invalid arguments JSON: "));
        assert_eq!(result.args, serde_json::json!(r#"{"type": "source", "label": "A""#));
        assert!(canvas.get_state().await.unwrap().nodes.is_empty());

        let followup = &provider.requests()[2];
        let tool_message = followup.messages.last().unwrap();
        assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
        assert!(tool_message.content.starts_with("Error: invalid arguments JSON: "));
    }

    #[tokio::test]
    async fn tool_turn_limit_ends_the_step() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            text_response(&plan_json(&["Add A"])),
            tool_call_response(vec![tool_call(
                "call_1",
                "add_node",
                serde_json::json!({"type": "source", "label": "A"}),
            )]),
            text_response(&finish_json("done")),
        ]));
        let (agent, canvas) = agent(provider);
        let agent = agent.with_max_tool_iterations(1);
        let (tx, _rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let outcome = agent.run("g", &tx).await.unwrap();
        assert!(outcome.history[0].output.starts_with("Stopped after 1 tool-calling turns"));
        assert_eq!(canvas.get_state().await.unwrap().nodes.len(), 1);
    }

    #[tokio::test]
    async fn malformed_planner_output_ends_with_error_event() {
        let provider = Arc::new(SequentialMockProvider::new(vec![text_response(
            "Sure! First add A, then B.",
        )]));
        let (agent, _) = agent(provider);

        let events = drain(agent.run_stream("g")).await;
        match events.last() {
            Some(LoopEvent::Error { message }) => assert!(message.contains("planner")),
            other => panic!("expected error event, got {other:?}"),
        }
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    }

    #[tokio::test]
    async fn provider_failure_is_fatal() {
        let provider = Arc::new(SequentialMockProvider::new(vec![text_response(&plan_json(&["a"]))]));
        let (agent, _) = agent(provider);
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let err = agent.forward("g", &tx).await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
        drop(tx);

        let mut last = None;
        while let Some(event) = rx.recv().await {
            last = Some(event);
        }
        assert!(matches!(last, Some(LoopEvent::Error { .. })));
    }

    #[tokio::test]
    async fn round_limit_stops_endless_replanning() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            text_response(&plan_json(&[])),
            text_response(&continue_json(&[])),
            text_response(&continue_json(&[])),
        ]));
        let (agent, _) = agent(provider.clone());
        let agent = agent.with_max_rounds(2);
        let (tx, _rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let err = agent.run("g", &tx).await.unwrap_err();
        assert!(matches!(err, Error::Agent(AgentError::RoundLimit(2))));
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn prompts_embed_the_canvas() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            text_response(&plan_json(&[])),
            text_response(&finish_json("ok")),
        ]));
        let canvas = Arc::new(InMemoryCanvas::new());
        canvas
            .add_node(plancanvas_core::canvas::Node::new("source", "Twitter"))
            .await
            .unwrap();
        let agent = PlanExecuteAgent::new(provider.clone(), "mock-model", canvas);
        let (tx, _rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        agent.run("g", &tx).await.unwrap();

        for request in provider.requests() {
            assert!(request.messages[0].content.contains(r#""label":"Twitter""#));
            assert!(request.tools.is_empty());
        }
    }

    #[tokio::test]
    async fn disconnected_consumer_does_not_stop_the_loop() {
        let provider = Arc::new(SequentialMockProvider::new(two_node_script()));
        let (agent, canvas) = agent(provider);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let outcome = agent.run(GOAL, &tx).await.unwrap();
        assert_eq!(outcome.canvas.edges.len(), 1);
        assert_eq!(canvas.get_state().await.unwrap().nodes.len(), 2);
    }
}
