//! Record store
//!
//! One [`StressRecord`] is written per successful prediction, keyed by the
//! request identifier. Writes are create-only: an existing id is never
//! overwritten and surfaces as [`StoreError::Conflict`].

mod http;
mod memory;

pub use http::{HttpRecordStore, HttpRecordStoreConfig};
pub use memory::InMemoryRecordStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::contracts::StressRecord;

/// Default table for prediction records
pub const DEFAULT_TABLE_NAME: &str = "StressPredictionScores";

/// Record store errors
///
/// Display strings lead with a kind token so the stringified error still
/// tells callers what went wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("ConnectionError: {0}")]
    Connection(String),

    #[error("ConditionalCheckFailedException: record '{0}' already exists")]
    Conflict(String),

    #[error("StoreRejected: {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("SerializationError: {0}")]
    Serialization(String),
}

/// Create-only persistence for stress records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Write `record` as a new item
    ///
    /// Nothing is stored when this returns an error.
    async fn put_new(&self, record: &StressRecord) -> Result<(), StoreError>;
}
