//! Replanner: decides whether the goal is met or which steps remain.

use plancanvas_core::message::Message;
use serde::Deserialize;
use tracing::debug;

use super::{LoopState, PlanExecuteAgent, structured};

pub(crate) const ROLE: &str = "replanner";

/// The replanner's verdict. A non-blank `response` ends the loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReplanDecision {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub plan: Option<Vec<String>>,
}

pub(crate) fn instruction(canvas_json: &str) -> String {
    format!(
        "You review progress on a graph construction goal.\n\
         Current canvas: {canvas_json}\n\
         Compare the original goal with the completed steps and with the canvas itself. \
         The goal is met only when every requested node and connection is present.\n\
         If work remains, put the remaining steps in \"plan\" and set \"response\" to null.\n\
         Only when the goal is fully met, put a short answer for the user in \"response\".\n\
         Nodes already on the canvas must not be added again.\n\
         Answer with a JSON object of the form \
         {{\"response\": string or null, \"plan\": [string] or null}}."
    )
}

/// The user turn: goal, plan as it stood, and every step's result so far.
pub(crate) fn progress_report(state: &LoopState) -> String {
    let mut report = format!("Original goal: {}\nCurrent plan:\n", state.goal);
    if state.plan.is_empty() {
        report.push_str("(empty)\n");
    }
    for (i, step) in state.plan.iter().enumerate() {
        report.push_str(&format!("{}. {step}\n", i + 1));
    }
    report.push_str("Completed steps and results:\n");
    if state.history.is_empty() {
        report.push_str("(none)\n");
    }
    for entry in &state.history {
        report.push_str(&format!("- {}\n  result: {}\n", entry.step, entry.output));
    }
    report.push_str("\nUpdate the plan or finish.");
    report
}

impl PlanExecuteAgent {
    pub(crate) async fn replan(&self, state: &LoopState) -> plancanvas_core::Result<ReplanDecision> {
        let canvas_json = self.canvas_json().await?;
        let mut request = self.request(vec![
            Message::system(instruction(&canvas_json)),
            Message::user(progress_report(state)),
        ]);
        request.json_output = true;

        let response = self.provider.complete(request).await?;
        let decision: ReplanDecision = structured::parse(ROLE, &response.message.content)?;
        debug!(?decision, "replanner output");
        Ok(decision)
    }
}
