//! plancanvas CLI: the main entry point.
//!
//! Commands:
//! - `serve`  Start the HTTP gateway
//! - `run`    Run one goal against a fresh canvas
//! - `chat`   Interactive mode keeping one canvas across turns
//! - `init`   Write the default config file

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "plancanvas",
    about = "plancanvas: plan, execute and replan your way to a node/edge canvas",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run a single goal and print the resulting canvas
    Run {
        /// What the canvas should contain
        goal: String,

        /// Print raw NDJSON events instead of readable progress
        #[arg(long)]
        json: bool,
    },

    /// Build a canvas interactively, one goal per line
    Chat,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so `run --json` keeps stdout pure NDJSON.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Run { goal, json } => commands::run::run(goal, json).await?,
        Commands::Chat => commands::chat::run().await?,
        Commands::Init { force } => commands::init::run(force)?,
    }

    Ok(())
}
