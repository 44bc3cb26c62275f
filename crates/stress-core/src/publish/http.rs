//! IoT data-plane publish over HTTPS
//!
//! `POST {endpoint}/topics/{topic}?qos={n}` with the JSON payload as body.

use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;

use super::{NotificationPublisher, PublishError, QualityOfService};

/// Configuration for the HTTP publisher
#[derive(Debug, Clone)]
pub struct HttpPublisherConfig {
    /// Data-plane endpoint, e.g. `https://<id>-ats.iot.<region>.amazonaws.com`
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

impl Default for HttpPublisherConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8883".to_string(),
            api_key: None,
            timeout_ms: 5000,
        }
    }
}

pub struct HttpPublisher {
    client: Client,
    config: HttpPublisherConfig,
}

impl HttpPublisher {
    pub fn new(config: HttpPublisherConfig) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| PublishError::Connection(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// `{endpoint}/topics/{topic}` with the topic as one encoded path segment
    fn topic_url(&self, topic: &str) -> Result<Url, PublishError> {
        let mut url = Url::parse(&self.config.endpoint).map_err(|e| {
            PublishError::Connection(format!("invalid endpoint '{}': {}", self.config.endpoint, e))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                PublishError::Connection(format!(
                    "endpoint '{}' cannot take a path",
                    self.config.endpoint
                ))
            })?
            .pop_if_empty()
            .push("topics")
            .push(topic);

        Ok(url)
    }
}

#[async_trait]
impl NotificationPublisher for HttpPublisher {
    async fn publish(
        &self,
        topic: &str,
        payload: &serde_json::Value,
        qos: QualityOfService,
    ) -> Result<(), PublishError> {
        let body =
            serde_json::to_vec(payload).map_err(|e| PublishError::Serialization(e.to_string()))?;

        let mut builder = self
            .client
            .post(self.topic_url(topic)?)
            .query(&[("qos", qos.level())])
            .header("Content-Type", "application/json")
            .body(body);

        if let Some(key) = &self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| PublishError::Connection(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(topic = %topic, qos = qos.level(), "Published message");
            Ok(())
        } else {
            Err(PublishError::Rejected {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            })
        }
    }
}
