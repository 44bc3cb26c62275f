//! Stress Monitor contracts
//!
//! Input, record and payload types exchanged between the functions and their
//! collaborators.

mod reading;
mod record;

pub use reading::*;
pub use record::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete stress level produced by the classifier
///
/// Serialized as its integer label so payloads and stored items read
/// `{"stressLevel": 1}` rather than an enum name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum StressLevel {
    None = 0,
    Low = 1,
    High = 2,
}

impl StressLevel {
    pub const ALL: [StressLevel; 3] = [StressLevel::None, StressLevel::Low, StressLevel::High];

    /// Integer label as stored and published
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    /// Human-readable label used in reports
    pub fn label(self) -> &'static str {
        match self {
            StressLevel::None => "No Stress",
            StressLevel::Low => "Low Stress",
            StressLevel::High => "High Stress",
        }
    }

    /// Report label for a raw score, where anything other than 0 or 1 is high
    pub fn label_for_score(score: i64) -> &'static str {
        match score {
            0 => StressLevel::None.label(),
            1 => StressLevel::Low.label(),
            _ => StressLevel::High.label(),
        }
    }
}

impl TryFrom<i64> for StressLevel {
    type Error = InvalidStressLevel;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(StressLevel::None),
            1 => Ok(StressLevel::Low),
            2 => Ok(StressLevel::High),
            other => Err(InvalidStressLevel(other)),
        }
    }
}

impl From<StressLevel> for i64 {
    fn from(level: StressLevel) -> Self {
        level.as_i64()
    }
}

impl fmt::Display for StressLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i64())
    }
}

/// Label outside {0, 1, 2}
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("stress level must be 0, 1 or 2, got {0}")]
pub struct InvalidStressLevel(pub i64);

/// Payload published to the device after a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(rename = "stressLevel")]
    pub stress_level: StressLevel,
}

impl NotificationPayload {
    pub fn new(stress_level: StressLevel) -> Self {
        Self { stress_level }
    }
}

/// Payload published by the scheduled reminder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPayload {
    pub message: String,
}

/// Response envelope returned to the invoking environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: serde_json::Value,
}

impl HandlerResponse {
    /// 200 response with the given body
    pub fn ok(body: impl Into<serde_json::Value>) -> Self {
        Self {
            status_code: 200,
            body: body.into(),
        }
    }

    /// 500 response with the given body
    pub fn failure(body: impl Into<serde_json::Value>) -> Self {
        Self {
            status_code: 500,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}
