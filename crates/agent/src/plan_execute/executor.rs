//! Executor: carries out a single plan step through the canvas tools.
//!
//! This is a bounded tool-calling loop. The model sees the step and the
//! tool definitions; every tool call it requests is executed, reported on
//! the event stream, and fed back as a tool message. The loop ends when
//! the model answers with text only.

use plancanvas_core::message::Message;
use plancanvas_core::tool::ToolCall;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{PlanExecuteAgent, emit};
use crate::stream_event::{LoopEvent, ToolInvocation};

pub(crate) fn instruction(canvas_json: &str) -> String {
    format!(
        "You carry out one step of a graph construction plan using the canvas tools.\n\
         Current canvas: {canvas_json}\n\
         Call the tools needed to complete the step, then reply with a short summary \
         of what changed.\n\
         If the step cannot be done, say why instead of guessing."
    )
}

impl PlanExecuteAgent {
    /// Run one step to completion and return the executor's final text.
    pub(crate) async fn execute_step(
        &self,
        step: &str,
        tx: &mpsc::Sender<LoopEvent>,
    ) -> plancanvas_core::Result<String> {
        let canvas_json = self.canvas_json().await?;
        let tool_defs = self.tools.definitions();
        let mut messages = vec![
            Message::system(instruction(&canvas_json)),
            Message::user(step),
        ];
        let mut last_text = String::new();

        for turn in 1..=self.max_tool_iterations {
            let mut request = self.request(messages.clone());
            request.tools = tool_defs.clone();

            let response = self.provider.complete(request).await?;
            if !response.message.content.trim().is_empty() {
                last_text = response.message.content.clone();
            }

            if response.message.tool_calls.is_empty() {
                debug!(turn, "executor finished step");
                return Ok(response.message.content);
            }

            let tool_calls = response.message.tool_calls.clone();
            messages.push(response.message);

            for tc in &tool_calls {
                let arguments: serde_json::Value = match serde_json::from_str(&tc.arguments) {
                    Ok(arguments) => arguments,
                    Err(e) => {
                        warn!(tool = %tc.name, error = %e, "tool arguments are not valid JSON");
                        let raw = serde_json::Value::String(tc.arguments.clone());
                        let output = format!("Error: invalid arguments JSON: {e}");
                        emit(
                            tx,
                            LoopEvent::ToolCall {
                                tool: ToolInvocation::requested(&tc.id, &tc.name, raw.clone()),
                            },
                        )
                        .await;
                        emit(
                            tx,
                            LoopEvent::ToolCall {
                                tool: ToolInvocation::finished(&tc.id, &tc.name, raw, &output, false),
                            },
                        )
                        .await;
                        messages.push(Message::tool_result(&tc.id, output));
                        continue;
                    }
                };

                emit(
                    tx,
                    LoopEvent::ToolCall {
                        tool: ToolInvocation::requested(&tc.id, &tc.name, arguments.clone()),
                    },
                )
                .await;

                let call = ToolCall {
                    id: tc.id.clone(),
                    name: tc.name.clone(),
                    arguments: arguments.clone(),
                };
                let (output, success) = match self.tools.execute(&call).await {
                    Ok(result) => (result.output, result.success),
                    Err(e) => (format!("Error: {e}"), false),
                };
                debug!(tool = %tc.name, success, "tool executed");

                emit(
                    tx,
                    LoopEvent::ToolCall {
                        tool: ToolInvocation::finished(&tc.id, &tc.name, arguments, &output, success),
                    },
                )
                .await;

                messages.push(Message::tool_result(&tc.id, output));
            }
        }

        warn!(
            limit = self.max_tool_iterations,
            "executor reached its tool-calling limit"
        );
        if last_text.is_empty() {
            last_text = format!(
                "Stopped after {} tool-calling turns without a final answer.",
                self.max_tool_iterations
            );
        }
        Ok(last_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_embeds_canvas() {
        let text = instruction(r#"{"nodes":[{"id":"1","type":"source","label":"A"}],"edges":[]}"#);
        assert!(text.contains(r#""label":"A""#));
        assert!(text.starts_with("You carry out one step"));
    }
}
