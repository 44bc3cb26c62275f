//! Key-value store client speaking the JSON `PutItem` protocol
//!
//! Items are written with `attribute_not_exists(id)` so an id that is
//! already present fails with a conditional-check error instead of being
//! replaced.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{RecordStore, StoreError, DEFAULT_TABLE_NAME};
use crate::contracts::{Item, StressRecord};

const PUT_ITEM_TARGET: &str = "DynamoDB_20120810.PutItem";
const AMZ_JSON: &str = "application/x-amz-json-1.0";
const CONDITIONAL_CHECK_FAILED: &str = "ConditionalCheckFailedException";

/// Configuration for the HTTP record store
#[derive(Debug, Clone)]
pub struct HttpRecordStoreConfig {
    /// Store endpoint
    pub endpoint: String,
    pub table_name: String,
    /// Bearer token, when the endpoint sits behind a gateway
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

impl Default for HttpRecordStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000".to_string(),
            table_name: DEFAULT_TABLE_NAME.to_string(),
            api_key: None,
            timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PutItemRequest<'a> {
    table_name: &'a str,
    item: Item,
    condition_expression: &'static str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type", default)]
    error_type: String,
    #[serde(alias = "Message", default)]
    message: String,
}

/// HTTP record store
pub struct HttpRecordStore {
    client: Client,
    config: HttpRecordStoreConfig,
}

impl HttpRecordStore {
    pub fn new(config: HttpRecordStoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn table_name(&self) -> &str {
        &self.config.table_name
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn put_new(&self, record: &StressRecord) -> Result<(), StoreError> {
        let request = PutItemRequest {
            table_name: &self.config.table_name,
            item: record.to_item(),
            condition_expression: "attribute_not_exists(id)",
        };
        let body =
            serde_json::to_vec(&request).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut builder = self
            .client
            .post(&self.config.endpoint)
            .header("Content-Type", AMZ_JSON)
            .header("X-Amz-Target", PUT_ITEM_TARGET)
            .body(body);

        if let Some(key) = &self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(
                record_id = %record.id,
                table = %self.config.table_name,
                "Stored stress record"
            );
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        let error: Option<ErrorBody> = serde_json::from_str(&text).ok();

        match error {
            Some(body)
                if status == StatusCode::BAD_REQUEST
                    && body.error_type.ends_with(CONDITIONAL_CHECK_FAILED) =>
            {
                Err(StoreError::Conflict(record.id.clone()))
            }
            Some(body) if !body.message.is_empty() => Err(StoreError::Rejected {
                status: status.as_u16(),
                message: body.message,
            }),
            _ => Err(StoreError::Rejected {
                status: status.as_u16(),
                message: text,
            }),
        }
    }
}
