//! Stress Reminder function
//!
//! Triggered on a schedule; publishes a fixed reminder text to the device's
//! notification topic and answers `"Message sent!"`. The trigger event
//! carries nothing the function needs.

pub mod handler;

pub use handler::{create_router, AppState};

use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use stress_core::config::{ConfigError, StressConfig};
use stress_core::contracts::{HandlerResponse, ReminderPayload};
use stress_core::publish::{NotificationPublisher, PublishError, QualityOfService, REMINDER_TOPIC};
use stress_core::telemetry::FunctionMetrics;

pub const AGENT_NAME: &str = "stress-reminder";

/// Body returned once the reminder is handed to the broker
pub const SENT_BODY: &str = "Message sent!";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Metrics registration failed: {0}")]
    Metrics(#[from] prometheus::Error),
}

pub struct ReminderHandler {
    publisher: Arc<dyn NotificationPublisher>,
    topic: String,
    message: String,
    qos: QualityOfService,
}

impl ReminderHandler {
    pub fn new(publisher: Arc<dyn NotificationPublisher>, message: impl Into<String>) -> Self {
        Self {
            publisher,
            topic: REMINDER_TOPIC.to_string(),
            message: message.into(),
            qos: QualityOfService::AtLeastOnce,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn with_qos(mut self, qos: QualityOfService) -> Self {
        self.qos = qos;
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Publish the reminder; a publish failure is returned to the caller
    pub async fn send(&self, request_id: &str) -> Result<HandlerResponse, PublishError> {
        let payload = serde_json::to_value(ReminderPayload {
            message: self.message.clone(),
        })
        .map_err(|e| PublishError::Serialization(e.to_string()))?;

        self.publisher
            .publish(&self.topic, &payload, self.qos)
            .await
            .map_err(|e| {
                tracing::error!(request_id = %request_id, topic = %self.topic, error = %e, "Reminder publish failed");
                e
            })?;

        tracing::info!(request_id = %request_id, topic = %self.topic, "Reminder published");
        Ok(HandlerResponse::ok(json!(SENT_BODY)))
    }
}

pub fn bootstrap(config: &StressConfig) -> Result<AppState, StartupError> {
    let handler = ReminderHandler::new(config.publisher.build()?, config.reminder.message.clone())
        .with_topic(config.publisher.reminder_topic.clone())
        .with_qos(config.publisher.qos);

    Ok(AppState::new(handler, FunctionMetrics::new(AGENT_NAME)?))
}
