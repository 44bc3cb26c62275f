//! Stress Prediction function entry point

use clap::{Parser, Subcommand};
use std::io::Read;
use std::net::SocketAddr;
use std::path::PathBuf;

use stress_core::config::StressConfig;
use stress_core::edge;
use stress_core::telemetry::init_tracing;
use stress_prediction::{bootstrap, create_router, AGENT_NAME};

#[derive(Parser)]
#[command(name = "stress-prediction")]
#[command(about = "Stress Prediction function - classify, store and publish sensor readings")]
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
        #[arg(short, long, default_value = "8080", env = "PORT")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
    },

    /// Run one event and print the response envelope
    Invoke {
        /// Event file, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        event: String,

        /// Request id to store the record under
        #[arg(long)]
        request_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(AGENT_NAME);

    let cli = Cli::parse();
    let config = StressConfig::load(cli.config.as_deref())?;
    let state = bootstrap(&config).await?;

    match cli.command {
        Commands::Serve { port, host } => {
            let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
            tracing::info!(
                function = AGENT_NAME,
                model_id = %state.pipeline.model_id(),
                "Starting on {}",
                addr
            );
            edge::serve(create_router(state), addr, config.edge.clone()).await?;
        }

        Commands::Invoke { event, request_id } => {
            let content = if event == "-" {
                let mut buffer = String::new();
                std::io::stdin().read_to_string(&mut buffer)?;
                buffer
            } else {
                std::fs::read_to_string(&event)?
            };
            let event: serde_json::Value = serde_json::from_str(&content)?;
            let request_id = request_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

            let response = state.pipeline.handle(&event, &request_id).await;
            println!("{}", serde_json::to_string_pretty(&response)?);

            if !response.is_success() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
