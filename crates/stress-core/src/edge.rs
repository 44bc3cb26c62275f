//! Edge function wrapper
//!
//! Every function binary serves its router through [`handle_request`], which
//! assigns the request id, enforces body-size and time limits, and turns
//! wrapper failures into the usual `{statusCode, body}` JSON envelope.
//!
//! The request id comes from the invoking environment's `X-Request-Id`
//! header when present; otherwise a UUID v4 is generated. Handlers read it
//! back with the [`RequestId`] extractor.

use axum::{
    async_trait,
    body::Body,
    extract::{rejection::BytesRejection, DefaultBodyLimit, FromRequestParts, Request},
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use thiserror::Error;
use tower::ServiceExt;
use tower_http::trace::TraceLayer;

use crate::config::EdgeSettings;
use crate::contracts::HandlerResponse;
use crate::telemetry::FunctionMetrics;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Errors raised by the wrapper itself, before or around the handler
#[derive(Debug, Error)]
pub enum EdgeFunctionError {
    #[error("Request body too large: {size} bytes exceeds limit of {limit} bytes")]
    BodyTooLarge { size: usize, limit: usize },

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl EdgeFunctionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EdgeFunctionError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            EdgeFunctionError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            EdgeFunctionError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            EdgeFunctionError::BodyTooLarge { .. } => "BODY_TOO_LARGE",
            EdgeFunctionError::Timeout(_) => "TIMEOUT",
            EdgeFunctionError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

/// Request id assigned by [`handle_request`] or supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(generate_request_id);
        Ok(RequestId(id))
    }
}

fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Make sure the request carries an id header and return it
fn ensure_request_id(request: &mut Request) -> String {
    if let Some(existing) = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        return existing.to_string();
    }

    let id = generate_request_id();
    if let Ok(value) = HeaderValue::from_str(&id) {
        request.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    id
}

/// Run one request through `router` with the edge limits applied
pub async fn handle_request(router: Router, mut request: Request, settings: &EdgeSettings) -> Response {
    let start_time = Instant::now();
    let request_id = ensure_request_id(&mut request);

    tracing::info!(
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
        "Processing edge function request"
    );

    if let Some(content_length) = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
    {
        if content_length > settings.max_body_size {
            return error_response(
                EdgeFunctionError::BodyTooLarge {
                    size: content_length,
                    limit: settings.max_body_size,
                },
                &request_id,
            );
        }
    }

    let router = router.layer(DefaultBodyLimit::max(settings.max_body_size));
    let timeout = Duration::from_millis(settings.timeout_ms);

    let result = match tokio::time::timeout(timeout, router.oneshot(request)).await {
        Ok(result) => result.map_err(|e| EdgeFunctionError::InternalError(e.to_string())),
        Err(_) => Err(EdgeFunctionError::Timeout(settings.timeout_ms)),
    };

    let duration_ms = start_time.elapsed().as_millis() as u64;
    match result {
        Ok(mut response) => {
            if let Ok(value) = HeaderValue::from_str(&request_id) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            tracing::info!(
                request_id = %request_id,
                status = %response.status(),
                duration_ms = duration_ms,
                "Edge function request completed"
            );
            response
        }
        Err(err) => {
            tracing::error!(
                request_id = %request_id,
                error = %err,
                duration_ms = duration_ms,
                "Edge function request failed"
            );
            error_response(err, &request_id)
        }
    }
}

fn error_response(error: EdgeFunctionError, request_id: &str) -> Response {
    let status = error.status_code();
    let envelope = HandlerResponse {
        status_code: status.as_u16(),
        body: json!({ "error": error.to_string(), "code": error.error_code() }),
    };

    let mut response = (status, Json(envelope)).into_response();
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// HTTP response carrying the envelope, with the envelope's status code
pub fn envelope_response(envelope: HandlerResponse) -> Response {
    let status =
        StatusCode::from_u16(envelope.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(envelope)).into_response()
}

/// Envelope for a body the extractor refused to buffer
///
/// Bodies without `Content-Length` are only measured while they are read, so
/// the size limit surfaces here rather than in [`handle_request`].
pub fn body_rejection_response(rejection: BytesRejection) -> Response {
    let status = rejection.status();
    let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "BODY_TOO_LARGE"
    } else {
        "INVALID_BODY"
    };

    envelope_response(HandlerResponse {
        status_code: status.as_u16(),
        body: json!({ "error": rejection.body_text(), "code": code }),
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub function: &'static str,
    pub version: &'static str,
}

pub fn health_response(function: &'static str) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        function,
        version: crate::VERSION,
    })
}

/// Prometheus text exposition
pub fn metrics_response(metrics: &FunctionMetrics) -> Response {
    match metrics.render() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Serve `router` on `addr`, routing every request through [`handle_request`]
pub async fn serve(router: Router, addr: SocketAddr, settings: EdgeSettings) -> std::io::Result<()> {
    let app = Router::new()
        .fallback(move |request: Request| {
            let router = router.clone();
            let settings = settings.clone();
            async move { handle_request(router, request, &settings).await }
        })
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Listening for invocations");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await
}

/// Collect a response body as JSON, for tests and the CLI
pub async fn response_json(response: Response) -> Result<serde_json::Value, EdgeFunctionError> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .map_err(|e| EdgeFunctionError::InternalError(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| EdgeFunctionError::InternalError(e.to_string()))
}
