//! `plancanvas chat`: interactive mode. Every goal edits the same canvas.

use plancanvas_agent::PlanExecuteAgent;
use plancanvas_canvas::InMemoryCanvas;
use plancanvas_core::canvas::CanvasRepository;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let provider = super::default_provider(&config)?;
    let agent = PlanExecuteAgent::from_config(&config, provider, Arc::new(InMemoryCanvas::new()));

    println!();
    println!("  plancanvas: interactive mode");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!();
    println!("  Describe what the canvas should contain and press Enter.");
    println!("  Type 'exit' or 'quit' to leave.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let goal = line.trim();
        if goal.is_empty() {
            continue;
        }
        if is_exit(goal) {
            break;
        }

        // A failed run was already reported by its `error` event.
        if let Ok(outcome) = super::run::drive(&agent, goal, false).await {
            println!(
                "  Canvas: {} nodes, {} edges",
                outcome.canvas.nodes.len(),
                outcome.canvas.edges.len()
            );
        }
        println!();
    }

    let canvas = agent.canvas().get_state().await?;
    println!();
    println!("{}", serde_json::to_string_pretty(&canvas)?);
    println!("  Goodbye!");
    Ok(())
}

fn is_exit(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}
