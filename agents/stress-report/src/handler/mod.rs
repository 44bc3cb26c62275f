//! HTTP routes for the report function

use axum::{
    extract::State,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

use stress_core::contracts::HandlerResponse;
use stress_core::edge::{envelope_response, health_response, metrics_response, HealthResponse, RequestId};
use stress_core::telemetry::{FunctionMetrics, Outcome};

use crate::report::ReportError;
use crate::{ReportHandler, AGENT_NAME};

#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<ReportHandler>,
    pub metrics: Arc<FunctionMetrics>,
}

impl AppState {
    pub fn new(handler: ReportHandler, metrics: FunctionMetrics) -> Self {
        Self {
            handler: Arc::new(handler),
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

fn failed_stage(error: &ReportError) -> &'static str {
    match error {
        ReportError::Query(_) => "query",
        ReportError::InvalidTimestamp { .. } => "render",
        ReportError::Mail(_) => "mail",
    }
}

async fn invoke(State(state): State<AppState>, RequestId(request_id): RequestId) -> Response {
    let start = Instant::now();

    let (outcome, envelope) = match state.handler.send(&request_id).await {
        Ok(envelope) => (Outcome::Success, envelope),
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Report failed");
            (
                Outcome::Failure(failed_stage(&e)),
                HandlerResponse::failure(json!({ "error": e.to_string() })),
            )
        }
    };
    state.metrics.record_invocation(outcome, start.elapsed());

    envelope_response(envelope)
}

async fn health() -> Json<HealthResponse> {
    health_response(AGENT_NAME)
}

async fn metrics(State(state): State<AppState>) -> Response {
    metrics_response(&state.metrics)
}
