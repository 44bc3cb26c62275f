//! Stress Report function
//!
//! Triggered daily. Queries every score created on the current UTC date,
//! renders them as a plain-text summary and emails it to the configured
//! administrator.
//!
//! ## Architecture
//!
//! 1. **Report** (`report`): subject and body formatting.
//! 2. **Handler** (`handler/`): axum routes served through the shared edge
//!    wrapper.
//!
//! Query and send failures propagate; nothing is retried and the result set
//! is not paginated.

pub mod handler;
pub mod report;

pub use handler::{create_router, AppState};
pub use report::{render_body, subject_for, ReportError};

use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use stress_core::clock::{utc_date, Clock, SystemClock};
use stress_core::config::{ConfigError, StressConfig};
use stress_core::contracts::HandlerResponse;
use stress_core::mail::{EmailMessage, Mailer};
use stress_core::scores::ScoreSource;
use stress_core::telemetry::FunctionMetrics;

pub const AGENT_NAME: &str = "stress-report";

/// Body returned once the email has been accepted
pub const SENT_BODY: &str = "Email sent successfully!";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Metrics registration failed: {0}")]
    Metrics(#[from] prometheus::Error),
}

pub struct ReportHandler {
    scores: Arc<dyn ScoreSource>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    sender: String,
    recipient: String,
}

impl ReportHandler {
    pub fn new(
        scores: Arc<dyn ScoreSource>,
        mailer: Arc<dyn Mailer>,
        sender: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            scores,
            mailer,
            clock: Arc::new(SystemClock),
            sender: sender.into(),
            recipient: recipient.into(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build today's report without sending it
    pub async fn compose(&self, request_id: &str) -> Result<EmailMessage, ReportError> {
        let today = utc_date(self.clock.now_utc());
        let items = self.scores.list_for_date(&today).await?;
        tracing::info!(request_id = %request_id, date = %today, items = items.len(), "Scores fetched");

        Ok(EmailMessage {
            source: self.sender.clone(),
            destination: self.recipient.clone(),
            subject: subject_for(&today),
            body: render_body(&items)?,
        })
    }

    /// Compose and send today's report
    pub async fn send(&self, request_id: &str) -> Result<HandlerResponse, ReportError> {
        let message = self.compose(request_id).await?;
        let message_id = self.mailer.send(&message).await?;

        tracing::info!(
            request_id = %request_id,
            to = %message.destination,
            message_id = message_id.as_deref().unwrap_or("-"),
            "Report sent"
        );
        Ok(HandlerResponse::ok(json!(SENT_BODY)))
    }
}

pub fn bootstrap(config: &StressConfig) -> Result<AppState, StartupError> {
    let handler = ReportHandler::new(
        config.report.build()?,
        config.mail.build()?,
        config.mail.sender.clone(),
        config.mail.recipient.clone(),
    );

    Ok(AppState::new(handler, FunctionMetrics::new(AGENT_NAME)?))
}
