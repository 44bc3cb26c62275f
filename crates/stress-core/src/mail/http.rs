//! Email API client (`POST /v2/email/outbound-emails`)

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{EmailMessage, MailError, Mailer};

#[derive(Debug, Clone)]
pub struct HttpMailerConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

impl Default for HttpMailerConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://email.us-east-1.amazonaws.com".to_string(),
            api_key: None,
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    #[serde(rename = "MessageId")]
    message_id: Option<String>,
}

pub struct HttpMailer {
    client: Client,
    config: HttpMailerConfig,
}

impl HttpMailer {
    pub fn new(config: HttpMailerConfig) -> Result<Self, MailError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| MailError::Connection(e.to_string()))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<Option<String>, MailError> {
        let url = format!(
            "{}/v2/email/outbound-emails",
            self.config.endpoint.trim_end_matches('/')
        );

        let request = json!({
            "FromEmailAddress": message.source,
            "Destination": { "ToAddresses": [message.destination] },
            "Content": {
                "Simple": {
                    "Subject": { "Data": message.subject },
                    "Body": { "Text": { "Data": message.body } }
                }
            }
        });

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| MailError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MailError::Rejected {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        // The id is informational; an unreadable body still means "sent"
        let message_id = response
            .json::<SendEmailResponse>()
            .await
            .ok()
            .and_then(|r| r.message_id);

        tracing::info!(
            to = %message.destination,
            message_id = message_id.as_deref().unwrap_or("unknown"),
            "Email sent"
        );

        Ok(message_id)
    }
}
