//! Daily score query for the report
//!
//! Scores are kept by an external GraphQL data API; this module only reads
//! the items created on a given UTC date.

mod graphql;

pub use graphql::{GraphQlScoreSource, GraphQlScoreSourceConfig, LIST_SCORES_QUERY};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One score row as returned by the data API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreItem {
    pub email: String,
    /// ISO-8601 UTC instant, e.g. `2024-05-01T09:15:00.000Z`
    pub time: String,
    pub score: i64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("ConnectionError: {0}")]
    Connection(String),

    #[error("QueryRejected: {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("GraphQLError: {0}")]
    GraphQl(String),

    #[error("MalformedResponse: {0}")]
    Malformed(String),
}

/// Source of the day's score items
#[async_trait]
pub trait ScoreSource: Send + Sync {
    /// Items whose creation timestamp begins with `date_prefix` (`YYYY-MM-DD`)
    async fn list_for_date(&self, date_prefix: &str) -> Result<Vec<ScoreItem>, QueryError>;
}

/// Fixed item list, for local runs and tests
#[derive(Debug, Clone, Default)]
pub struct StaticScoreSource {
    items: Vec<ScoreItem>,
}

impl StaticScoreSource {
    pub fn new(items: Vec<ScoreItem>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl ScoreSource for StaticScoreSource {
    async fn list_for_date(&self, _date_prefix: &str) -> Result<Vec<ScoreItem>, QueryError> {
        Ok(self.items.clone())
    }
}
