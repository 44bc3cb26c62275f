use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{QueryError, ScoreItem, ScoreSource};

/// Scores created on a date, filtered server-side by prefix
pub const LIST_SCORES_QUERY: &str = r#"
query ListStressLevels($date: String!) {
    listScores(filter: {createdAt: {beginsWith: $date}}) {
        items {
            email
            time
            score
        }
    }
}
"#;

#[derive(Debug, Clone)]
pub struct GraphQlScoreSourceConfig {
    /// GraphQL endpoint URL
    pub url: String,
    /// Value of the `x-api-key` header
    pub api_key: String,
    pub timeout_ms: u64,
}

impl Default for GraphQlScoreSourceConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:20002/graphql".to_string(),
            api_key: String::new(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'static str,
    variables: Variables<'a>,
}

#[derive(Serialize)]
struct Variables<'a> {
    date: &'a str,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<ListScoresData>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListScoresData {
    list_scores: Option<ItemPage>,
}

#[derive(Deserialize)]
struct ItemPage {
    items: Vec<ScoreItem>,
}

#[derive(Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

/// GraphQL data API client
pub struct GraphQlScoreSource {
    client: Client,
    config: GraphQlScoreSourceConfig,
}

impl GraphQlScoreSource {
    pub fn new(config: GraphQlScoreSourceConfig) -> Result<Self, QueryError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| QueryError::Connection(e.to_string()))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl ScoreSource for GraphQlScoreSource {
    async fn list_for_date(&self, date_prefix: &str) -> Result<Vec<ScoreItem>, QueryError> {
        let request = GraphQlRequest {
            query: LIST_SCORES_QUERY,
            variables: Variables { date: date_prefix },
        };

        let response = self
            .client
            .post(&self.config.url)
            .header("x-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| QueryError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Rejected {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| QueryError::Malformed(e.to_string()))?;

        if !body.errors.is_empty() {
            let messages: Vec<_> = body.errors.into_iter().map(|e| e.message).collect();
            return Err(QueryError::GraphQl(messages.join("; ")));
        }

        let items = body
            .data
            .and_then(|d| d.list_scores)
            .map(|page| page.items)
            .ok_or_else(|| QueryError::Malformed("missing data.listScores".to_string()))?;

        tracing::debug!(date = %date_prefix, count = items.len(), "Fetched score items");
        Ok(items)
    }
}
