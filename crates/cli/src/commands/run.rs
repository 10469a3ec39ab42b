//! `plancanvas run`: one goal, one fresh canvas.

use plancanvas_agent::{
    EVENT_CHANNEL_CAPACITY, LoopEvent, LoopOutcome, PlanExecuteAgent, ToolCallState,
    ToolInvocationKind,
};
use plancanvas_canvas::InMemoryCanvas;
use std::sync::Arc;
use tokio::sync::mpsc;

pub async fn run(goal: String, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let provider = super::default_provider(&config)?;
    let agent = PlanExecuteAgent::from_config(&config, provider, Arc::new(InMemoryCanvas::new()));

    let outcome = drive(&agent, &goal, json).await?;

    // In NDJSON mode the `canvas` line already carries the final state.
    if !json {
        println!();
        println!("{}", serde_json::to_string_pretty(&outcome.canvas)?);
    }
    Ok(())
}

/// A run ended with an `error` event, which has already been printed.
#[derive(thiserror::Error)]
#[error("run failed; see the error reported above")]
pub(super) struct RunFailed;

// `main` reports errors with `Debug`; keep it to the one short line.
impl std::fmt::Debug for RunFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

/// Run `goal` on `agent`, printing events as they arrive.
pub(super) async fn drive(
    agent: &PlanExecuteAgent,
    goal: &str,
    json: bool,
) -> Result<LoopOutcome, RunFailed> {
    let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

    let running = async move { agent.forward(goal, &tx).await };
    let printing = async {
        while let Some(event) = rx.recv().await {
            if json {
                match event.to_ndjson() {
                    Ok(line) => print!("{line}"),
                    Err(e) => tracing::warn!(error = %e, "failed to encode event"),
                }
            } else if let Some(text) = render(&event) {
                if event.is_terminal() {
                    eprint!("{text}");
                } else {
                    print!("{text}");
                }
            }
        }
    };

    let (result, ()) = tokio::join!(running, printing);
    result.map_err(|_| RunFailed)
}

/// Human-readable rendering of an event. `None` for events with nothing to show.
pub(super) fn render(event: &LoopEvent) -> Option<String> {
    match event {
        LoopEvent::ReasoningChunk { text } => Some(text.clone()),
        LoopEvent::Tasks { data } => {
            let mut out = String::new();
            for group in data {
                out.push_str(&format!("{}:\n", group.title));
                for item in &group.items {
                    out.push_str(&format!("  - {item}\n"));
                }
            }
            Some(out)
        }
        LoopEvent::ToolCall { tool } => Some(match tool.kind {
            ToolInvocationKind::ToolCall => format!("  -> {} {}\n", tool.tool_name, tool.args),
            ToolInvocationKind::ToolResult => {
                let status = if tool.state == ToolCallState::OutputError { " (failed)" } else { "" };
                format!(
                    "  <- {}{status}: {}\n",
                    tool.tool_name,
                    tool.result.as_deref().unwrap_or_default()
                )
            }
        }),
        LoopEvent::ContentChunk { text } => Some(format!("\n{text}\n")),
        LoopEvent::Sources { data } if !data.is_empty() => Some(
            data.iter()
                .map(|s| format!("  [{}] {}\n", s.title, s.url))
                .collect(),
        ),
        LoopEvent::Error { message } => Some(format!("Error: {message}\n")),
        LoopEvent::Sources { .. } | LoopEvent::Canvas { .. } | LoopEvent::Done => None,
    }
}
