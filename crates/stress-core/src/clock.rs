//! Wall-clock access and fixed-offset timestamps
//!
//! Records are stamped in a fixed UTC offset (UTC+3 by default) regardless
//! of the host's timezone. The offset never follows daylight-saving rules.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use std::fmt;

/// Default offset for record timestamps, in hours east of UTC
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 3;

/// Record timestamp layout
pub const RECORD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Date layout used to select a day's scores
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Source of the current instant
pub trait Clock: Send + Sync + fmt::Debug {
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a single instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Fixed UTC offset used to render record timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTime {
    offset: FixedOffset,
}

impl LocalTime {
    /// Offset of `hours` east of UTC, or `None` outside -14..=14
    pub fn new(hours: i32) -> Option<Self> {
        if !(-14..=14).contains(&hours) {
            return None;
        }
        FixedOffset::east_opt(hours * 3600).map(|offset| Self { offset })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Render `instant` at this offset as `YYYY-MM-DD HH:MM:SS`
    pub fn format(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.offset)
            .format(RECORD_TIME_FORMAT)
            .to_string()
    }
}

impl Default for LocalTime {
    fn default() -> Self {
        Self::new(DEFAULT_UTC_OFFSET_HOURS).unwrap_or(Self { offset: Utc.fix() })
    }
}

/// Current UTC date as `YYYY-MM-DD`
pub fn utc_date(instant: DateTime<Utc>) -> String {
    instant.format(DATE_FORMAT).to_string()
}
