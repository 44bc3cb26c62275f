//! Report text
//!
//! ```text
//! Stress Levels Report:
//!
//! Email: a@example.com, Time: 09:15, Stress Level: No Stress
//! Email: b@example.com, Time: 10:30, Stress Level: High Stress
//! ```

use chrono::NaiveDateTime;
use thiserror::Error;

use stress_core::contracts::StressLevel;
use stress_core::mail::MailError;
use stress_core::scores::{QueryError, ScoreItem};

/// Timestamp format of score items
pub const SCORE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Time-of-day format used in report lines
pub const LINE_TIME_FORMAT: &str = "%H:%M";

pub const REPORT_HEADER: &str = "Stress Levels Report:\n\n";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("InvalidTimestamp: '{time}' for {email} is not an ISO-8601 UTC instant")]
    InvalidTimestamp { email: String, time: String },
}

pub fn subject_for(date: &str) -> String {
    format!("Daily Stress Levels Report for {}", date)
}

/// `Email: {email}, Time: {HH:MM}, Stress Level: {label}\n`
pub fn format_line(item: &ScoreItem) -> Result<String, ReportError> {
    let time = NaiveDateTime::parse_from_str(&item.time, SCORE_TIME_FORMAT).map_err(|_| {
        ReportError::InvalidTimestamp {
            email: item.email.clone(),
            time: item.time.clone(),
        }
    })?;

    Ok(format!(
        "Email: {}, Time: {}, Stress Level: {}\n",
        item.email,
        time.format(LINE_TIME_FORMAT),
        StressLevel::label_for_score(item.score)
    ))
}

/// Header followed by one line per item, in the order given
pub fn render_body(items: &[ScoreItem]) -> Result<String, ReportError> {
    let mut body = String::from(REPORT_HEADER);
    for item in items {
        body.push_str(&format_line(item)?);
    }
    Ok(body)
}
