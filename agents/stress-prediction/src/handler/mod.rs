//! HTTP routes for the prediction function
//!
//! - `POST /invoke` - run the pipeline on a sensor event
//! - `GET /health` - liveness
//! - `GET /metrics` - Prometheus text exposition
//!
//! `/invoke` always answers with the `{statusCode, body}` envelope; the HTTP
//! status mirrors `statusCode`. A body over the size limit answers 413.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use stress_core::contracts::InputError;
use stress_core::edge::{
    body_rejection_response, envelope_response, health_response, metrics_response,
    HealthResponse, RequestId,
};
use stress_core::telemetry::{FunctionMetrics, Outcome};

use crate::pipeline::{PipelineError, StressPipeline};
use crate::AGENT_NAME;

/// State shared by all routes
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<StressPipeline>,
    pub metrics: Arc<FunctionMetrics>,
}

impl AppState {
    pub fn new(pipeline: StressPipeline, metrics: FunctionMetrics) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            metrics: Arc::new(metrics),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/invoke", post(invoke))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn invoke(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let start = Instant::now();

    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::warn!(request_id = %request_id, error = %rejection, "Event body rejected");
            state
                .metrics
                .record_invocation(Outcome::Failure("input"), start.elapsed());
            return body_rejection_response(rejection);
        }
    };

    let result = match serde_json::from_slice::<Value>(&body) {
        Ok(event) => state.pipeline.run_event(&event, &request_id).await,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Event body is not JSON");
            Err(PipelineError::Input(InputError::InvalidJson(e.to_string())))
        }
    };

    let outcome = match &result {
        Ok(prediction) => {
            state.metrics.record_prediction(prediction.stress_level);
            Outcome::Success
        }
        Err(e) => Outcome::Failure(e.stage().as_str()),
    };
    state.metrics.record_invocation(outcome, start.elapsed());

    envelope_response(StressPipeline::response_for(&result))
}

async fn health() -> Json<HealthResponse> {
    health_response(AGENT_NAME)
}

async fn metrics(State(state): State<AppState>) -> Response {
    metrics_response(&state.metrics)
}
