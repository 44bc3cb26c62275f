//! Stress Reminder function entry point

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

use stress_core::config::StressConfig;
use stress_core::edge;
use stress_core::telemetry::init_tracing;
use stress_reminder::{bootstrap, create_router, AGENT_NAME};

#[derive(Parser)]
#[command(name = "stress-reminder")]
#[command(about = "Stress Reminder function - publish the quiz reminder to the device")]
#[command(version)]
struct Cli {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(short, long, global = true, env = "STRESS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8081", env = "PORT")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
    },

    /// Publish the reminder once and print the response envelope
    Invoke,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(AGENT_NAME);

    let cli = Cli::parse();
    let config = StressConfig::load(cli.config.as_deref())?;
    let state = bootstrap(&config)?;

    match cli.command {
        Commands::Serve { port, host } => {
            let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
            tracing::info!(function = AGENT_NAME, "Starting on {}", addr);
            edge::serve(create_router(state), addr, config.edge.clone()).await?;
        }

        Commands::Invoke => {
            let request_id = uuid::Uuid::new_v4().to_string();
            let response = state.handler.send(&request_id).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
