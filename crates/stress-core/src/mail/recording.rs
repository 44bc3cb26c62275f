use async_trait::async_trait;
use std::sync::Mutex;

use super::{EmailMessage, MailError, Mailer};

/// Mailer that keeps sent messages in memory
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<Option<String>, MailError> {
        tracing::info!(
            to = %message.destination,
            subject = %message.subject,
            "Recorded email"
        );
        let mut sent = self.sent.lock().unwrap_or_else(|e| e.into_inner());
        sent.push(message.clone());
        Ok(Some(format!("local-{}", sent.len())))
    }
}
