use async_trait::async_trait;
use std::sync::Mutex;

use super::{NotificationPublisher, PublishError, QualityOfService};

/// A message captured by [`RecordingPublisher`]
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: serde_json::Value,
    pub qos: QualityOfService,
}

/// Publisher that keeps messages in memory and logs them
///
/// Used for local runs without a broker and in tests.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<PublishedMessage>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl NotificationPublisher for RecordingPublisher {
    async fn publish(
        &self,
        topic: &str,
        payload: &serde_json::Value,
        qos: QualityOfService,
    ) -> Result<(), PublishError> {
        tracing::info!(topic = %topic, qos = qos.level(), payload = %payload, "Recorded publish");
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(PublishedMessage {
                topic: topic.to_string(),
                payload: payload.clone(),
                qos,
            });
        Ok(())
    }
}
