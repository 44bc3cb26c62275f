//! Email delivery for the daily report

mod http;
mod recording;

pub use http::{HttpMailer, HttpMailerConfig};
pub use recording::RecordingMailer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A plain-text email with a single recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub source: String,
    pub destination: String,
    pub subject: String,
    pub body: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailError {
    #[error("ConnectionError: {0}")]
    Connection(String),

    #[error("MailRejected: {status}: {message}")]
    Rejected { status: u16, message: String },
}

/// Email-sending collaborator
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send `message`, returning the provider's message id when it gives one
    async fn send(&self, message: &EmailMessage) -> Result<Option<String>, MailError>;
}
