//! Shared test helpers: a scripted provider and reply builders.

use plancanvas_core::error::ProviderError;
use plancanvas_core::message::{Message, MessageToolCall};
use plancanvas_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::sync::Mutex;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue and
/// records the request. Running past the end of the script is a provider
/// error.
pub struct SequentialMockProvider {
    responses: Vec<ProviderResponse>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let index = requests.len();
        requests.push(request);
        self.responses
            .get(index)
            .cloned()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 500,
                message: format!("script exhausted after {} responses", self.responses.len()),
            })
    }
}

/// Create a simple text response (no tool calls).
pub fn text_response(text: &str) -> ProviderResponse {
    tool_call_response_with_text(vec![], text)
}

/// Create a response that only requests tool calls.
pub fn tool_call_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    tool_call_response_with_text(tool_calls, "")
}

fn tool_call_response_with_text(tool_calls: Vec<MessageToolCall>, text: &str) -> ProviderResponse {
    let mut msg = Message::assistant(text);
    msg.tool_calls = tool_calls;
    ProviderResponse {
        message: msg,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Helper to create a tool call.
pub fn tool_call(id: &str, name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: args.to_string(),
    }
}

/// A planner reply.
pub fn plan_json(steps: &[&str]) -> String {
    serde_json::json!({ "steps": steps }).to_string()
}

/// A replanner reply that keeps going with `steps`.
pub fn continue_json(steps: &[&str]) -> String {
    serde_json::json!({ "response": null, "plan": steps }).to_string()
}

/// A replanner reply that finishes the run.
pub fn finish_json(response: &str) -> String {
    serde_json::json!({ "response": response, "plan": null }).to_string()
}

/// Seven replies that build `A (source) -> B (sink)` in two rounds.
pub fn two_node_script() -> Vec<ProviderResponse> {
    let first = "Add node A of type source";
    let second = "Add node B of type sink and connect A to B";
    vec![
        text_response(&plan_json(&[first, second])),
        tool_call_response(vec![tool_call(
            "call_a",
            "add_node",
            serde_json::json!({"type": "source", "label": "A"}),
        )]),
        text_response("Added node A."),
        text_response(&continue_json(&[second])),
        tool_call_response(vec![
            tool_call("call_b", "add_node", serde_json::json!({"type": "sink", "label": "B"})),
            tool_call(
                "call_ab",
                "connect_nodes",
                serde_json::json!({"source_label": "A", "target_label": "B"}),
            ),
        ]),
        text_response("Added node B and connected A to B."),
        text_response(&finish_json("Node A is connected to node B.")),
    ]
}
