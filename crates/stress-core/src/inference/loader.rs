use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::ForestModel;

/// Errors that prevent the model from being loaded at start-up
#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("Failed to fetch model artifact: {0}")]
    Fetch(String),

    #[error("Model artifact I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model artifact digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("Model artifact is not valid JSON: {0}")]
    Parse(String),

    #[error("Model artifact is invalid: {0}")]
    Invalid(String),
}

/// Where the model artifact lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// Local file
    File(PathBuf),
    /// Object in a blob store, fetched with a plain GET
    Http(String),
}

impl ModelSource {
    /// `http(s)://` locations are fetched over HTTP, `file://` and bare paths
    /// are read from disk
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            ModelSource::Http(location.to_string())
        } else {
            let path = location.strip_prefix("file://").unwrap_or(location);
            ModelSource::File(PathBuf::from(path))
        }
    }
}

/// Settings for the one-time model load
#[derive(Debug, Clone)]
pub struct ModelLoaderConfig {
    pub source: ModelSource,
    /// Local copy of the fetched artifact
    pub cache_path: Option<PathBuf>,
    /// Expected hex SHA-256 of the artifact
    pub sha256: Option<String>,
    pub timeout_ms: u64,
}

impl ModelLoaderConfig {
    pub fn new(source: ModelSource) -> Self {
        Self {
            source,
            cache_path: None,
            sha256: None,
            timeout_ms: 10_000,
        }
    }
}

/// Fetches, verifies and parses the classifier once per process
///
/// The returned `Arc<ForestModel>` is the only handle to the model; callers
/// pass it into their handlers explicitly.
pub struct ModelLoader {
    config: ModelLoaderConfig,
}

impl ModelLoader {
    pub fn new(config: ModelLoaderConfig) -> Self {
        Self { config }
    }

    pub async fn load(&self) -> Result<Arc<ForestModel>, ModelLoadError> {
        let bytes = self.fetch().await?;

        if let Some(expected) = &self.config.sha256 {
            let actual = hex::encode(Sha256::digest(&bytes));
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(ModelLoadError::DigestMismatch {
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        if let Some(cache) = &self.config.cache_path {
            tokio::fs::write(cache, &bytes).await?;
            tracing::debug!(path = %cache.display(), "Cached model artifact");
        }

        let model = ForestModel::from_slice(&bytes)?;

        tracing::info!(
            model_id = %model.model_id,
            trees = model.trees.len(),
            bytes = bytes.len(),
            "Stress model loaded"
        );

        Ok(Arc::new(model))
    }

    async fn fetch(&self) -> Result<Vec<u8>, ModelLoadError> {
        match &self.config.source {
            ModelSource::File(path) => {
                tracing::info!(path = %path.display(), "Reading model artifact");
                Ok(tokio::fs::read(path).await?)
            }
            ModelSource::Http(url) => {
                tracing::info!(url = %url, "Downloading model artifact");
                let client = reqwest::Client::builder()
                    .timeout(Duration::from_millis(self.config.timeout_ms))
                    .build()
                    .map_err(|e| ModelLoadError::Fetch(e.to_string()))?;

                let response = client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| ModelLoadError::Fetch(e.to_string()))?;

                let status = response.status();
                if !status.is_success() {
                    return Err(ModelLoadError::Fetch(format!(
                        "blob store returned {}",
                        status
                    )));
                }

                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| ModelLoadError::Fetch(e.to_string()))?;
                Ok(bytes.to_vec())
            }
        }
    }
}
