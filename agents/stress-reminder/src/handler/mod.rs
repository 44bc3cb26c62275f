//! HTTP routes for the reminder function
//!
//! `POST /invoke` ignores its body. A publish failure becomes a 500 envelope
//! carrying the error text.

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

use crate::{ReminderHandler, AGENT_NAME};

#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<ReminderHandler>,
    pub metrics: Arc<FunctionMetrics>,
}

impl AppState {
    pub fn new(handler: ReminderHandler, metrics: FunctionMetrics) -> Self {
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

async fn invoke(State(state): State<AppState>, RequestId(request_id): RequestId) -> Response {
    let start = Instant::now();

    let (outcome, envelope) = match state.handler.send(&request_id).await {
        Ok(envelope) => (Outcome::Success, envelope),
        Err(e) => (
            Outcome::Failure("publish"),
            HandlerResponse::failure(json!({ "error": e.to_string() })),
        ),
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
