//! Planner: turns a goal into an ordered list of steps.

use plancanvas_core::message::Message;
use serde::Deserialize;
use tracing::debug;

use super::{PlanExecuteAgent, structured};

pub(crate) const ROLE: &str = "planner";

#[derive(Debug, Deserialize)]
struct PlanOutput {
    steps: Vec<String>,
}

pub(crate) fn instruction(canvas_json: &str) -> String {
    format!(
        "You plan the construction of a node graph on a shared canvas.\n\
         Current canvas: {canvas_json}\n\
         Break the user's request into an ordered list of small steps. \
         Each step is carried out by an executor that can only call these tools:\n\
         - add_node(type, label)\n\
         - connect_nodes(source_label, target_label)\n\
         Name the exact label and type of every node a step touches.\n\
         Nodes already on the canvas must not be added again.\n\
         Answer with a JSON object of the form {{\"steps\": [\"...\"]}}."
    )
}

impl PlanExecuteAgent {
    pub(crate) async fn plan_steps(&self, goal: &str) -> plancanvas_core::Result<Vec<String>> {
        let canvas_json = self.canvas_json().await?;
        let mut request = self.request(vec![
            Message::system(instruction(&canvas_json)),
            Message::user(goal),
        ]);
        request.json_output = true;

        let response = self.provider.complete(request).await?;
        let output: PlanOutput = structured::parse(ROLE, &response.message.content)?;
        debug!(steps = ?output.steps, "planner output");
        Ok(output.steps)
    }
}
