//! Stress Prediction function
//!
//! Receives one sensor reading per invocation, classifies it into a stress
//! level (0 none, 1 low, 2 high), stores the result keyed by the request id
//! and publishes `{"stressLevel": n}` to the device topic.
//!
//! ## Architecture
//!
//! 1. **Pipeline** (`pipeline/`): the staged invocation and its error model.
//! 2. **Handler** (`handler/`): axum routes served through the shared edge
//!    wrapper.
//!
//! The model is loaded once by [`bootstrap`] and shared read-only by all
//! invocations of the process.
//!
//! ## CLI Usage
//!
//! ```bash
//! # Serve invocations over HTTP
//! stress-prediction serve --port 8080
//!
//! # Run a single event from a file
//! stress-prediction --config stress.yaml invoke --event reading.json
//! ```

pub mod handler;
pub mod pipeline;

pub use handler::{create_router, AppState};
pub use pipeline::{PipelineError, PredictionOutcome, Stage, StressPipeline};

use thiserror::Error;

use stress_core::config::{ConfigError, StressConfig};
use stress_core::inference::ModelLoadError;
use stress_core::telemetry::FunctionMetrics;

/// Function name used in logs, metrics and health responses
pub const AGENT_NAME: &str = "stress-prediction";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Model loading failed: {0}")]
    Model(#[from] ModelLoadError),

    #[error("Metrics registration failed: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Build the pipeline and its collaborators from configuration
///
/// Loads the model before returning, so a bad artifact stops the process
/// instead of failing the first invocation.
pub async fn bootstrap(config: &StressConfig) -> Result<AppState, StartupError> {
    let model = config.model.loader().load().await?;

    let pipeline = StressPipeline::new(model, config.store.build()?, config.publisher.build()?)
        .with_local_time(config.clock.local_time()?)
        .with_topic(config.publisher.prediction_topic.clone())
        .with_qos(config.publisher.qos);

    let metrics = FunctionMetrics::new(AGENT_NAME)?;
    Ok(AppState::new(pipeline, metrics))
}
