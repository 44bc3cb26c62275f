//! Notification publisher
//!
//! Publish-only messaging towards the device. Delivery is at-least-once
//! (QoS 1) by default; subscribers may see duplicates.

mod http;
mod recording;

pub use http::{HttpPublisher, HttpPublisherConfig};
pub use recording::{PublishedMessage, RecordingPublisher};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Topic the device listens on for prediction results
pub const PREDICTION_TOPIC: &str = "esp32/sub";

/// Topic the device listens on for reminders
pub const REMINDER_TOPIC: &str = "esp32/notify";

/// MQTT delivery guarantee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum QualityOfService {
    AtMostOnce = 0,
    #[default]
    AtLeastOnce = 1,
}

impl QualityOfService {
    pub fn level(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for QualityOfService {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(QualityOfService::AtMostOnce),
            1 => Ok(QualityOfService::AtLeastOnce),
            other => Err(format!("unsupported QoS level {}", other)),
        }
    }
}

impl From<QualityOfService> for u8 {
    fn from(qos: QualityOfService) -> Self {
        qos.level()
    }
}

/// Publish errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("ConnectionError: {0}")]
    Connection(String),

    #[error("PublishRejected: {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("SerializationError: {0}")]
    Serialization(String),
}

/// Publish-only channel to the device
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    /// Send one JSON payload to `topic`; no acknowledgement beyond the call
    /// succeeding is awaited
    async fn publish(
        &self,
        topic: &str,
        payload: &serde_json::Value,
        qos: QualityOfService,
    ) -> Result<(), PublishError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qos_levels() {
        assert_eq!(QualityOfService::default(), QualityOfService::AtLeastOnce);
        assert_eq!(QualityOfService::AtLeastOnce.level(), 1);
        assert_eq!(QualityOfService::try_from(0), Ok(QualityOfService::AtMostOnce));
        assert!(QualityOfService::try_from(2).is_err());
    }
}
