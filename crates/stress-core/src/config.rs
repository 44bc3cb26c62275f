//! Function configuration
//!
//! Settings come from an optional YAML/TOML/JSON file, then `STRESS_*`
//! environment variables override individual fields. Every field has a
//! default, so an empty environment yields a runnable local setup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::clock::{LocalTime, DEFAULT_UTC_OFFSET_HOURS};
use crate::inference::{ModelLoader, ModelLoaderConfig, ModelSource};
use crate::mail::{HttpMailer, HttpMailerConfig, Mailer, RecordingMailer};
use crate::publish::{
    HttpPublisher, HttpPublisherConfig, NotificationPublisher, QualityOfService,
    RecordingPublisher, PREDICTION_TOPIC, REMINDER_TOPIC,
};
use crate::scores::{GraphQlScoreSource, GraphQlScoreSourceConfig, ScoreSource, StaticScoreSource};
use crate::store::{
    HttpRecordStore, HttpRecordStoreConfig, InMemoryRecordStore, RecordStore, DEFAULT_TABLE_NAME,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(String),

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to build {component}: {message}")]
    Build { component: &'static str, message: String },
}

/// How a collaborator is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Http,
    /// In-process stand-in, for local runs
    Memory,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(Backend::Http),
            "memory" => Ok(Backend::Memory),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// Complete configuration shared by all functions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    pub model: ModelSettings,
    pub store: StoreSettings,
    pub publisher: PublisherSettings,
    pub mail: MailSettings,
    pub report: ReportSettings,
    pub reminder: ReminderSettings,
    pub clock: ClockSettings,
    pub edge: EdgeSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// File path, `file://` URL or `http(s)://` blob URL
    pub location: String,
    pub cache_path: Option<PathBuf>,
    pub sha256: Option<String>,
    pub timeout_ms: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            location: "models/stress_model.json".to_string(),
            cache_path: None,
            sha256: None,
            timeout_ms: 10_000,
        }
    }
}

impl ModelSettings {
    pub fn loader(&self) -> ModelLoader {
        let mut config = ModelLoaderConfig::new(ModelSource::parse(&self.location));
        config.cache_path = self.cache_path.clone();
        config.sha256 = self.sha256.clone();
        config.timeout_ms = self.timeout_ms;
        ModelLoader::new(config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: Backend,
    pub endpoint: String,
    pub table_name: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        let http = HttpRecordStoreConfig::default();
        Self {
            backend: Backend::Http,
            endpoint: http.endpoint,
            table_name: DEFAULT_TABLE_NAME.to_string(),
            api_key: None,
            timeout_ms: http.timeout_ms,
        }
    }
}

impl StoreSettings {
    pub fn build(&self) -> Result<Arc<dyn RecordStore>, ConfigError> {
        match self.backend {
            Backend::Memory => Ok(Arc::new(InMemoryRecordStore::new())),
            Backend::Http => {
                let store = HttpRecordStore::new(HttpRecordStoreConfig {
                    endpoint: self.endpoint.clone(),
                    table_name: self.table_name.clone(),
                    api_key: self.api_key.clone(),
                    timeout_ms: self.timeout_ms,
                })
                .map_err(|e| ConfigError::Build {
                    component: "record store",
                    message: e.to_string(),
                })?;
                Ok(Arc::new(store))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherSettings {
    pub backend: Backend,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
    pub prediction_topic: String,
    pub reminder_topic: String,
    pub qos: QualityOfService,
}

impl Default for PublisherSettings {
    fn default() -> Self {
        let http = HttpPublisherConfig::default();
        Self {
            backend: Backend::Http,
            endpoint: http.endpoint,
            api_key: None,
            timeout_ms: http.timeout_ms,
            prediction_topic: PREDICTION_TOPIC.to_string(),
            reminder_topic: REMINDER_TOPIC.to_string(),
            qos: QualityOfService::AtLeastOnce,
        }
    }
}

impl PublisherSettings {
    pub fn build(&self) -> Result<Arc<dyn NotificationPublisher>, ConfigError> {
        match self.backend {
            Backend::Memory => Ok(Arc::new(RecordingPublisher::new())),
            Backend::Http => {
                let publisher = HttpPublisher::new(HttpPublisherConfig {
                    endpoint: self.endpoint.clone(),
                    api_key: self.api_key.clone(),
                    timeout_ms: self.timeout_ms,
                })
                .map_err(|e| ConfigError::Build {
                    component: "publisher",
                    message: e.to_string(),
                })?;
                Ok(Arc::new(publisher))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    pub backend: Backend,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
    pub sender: String,
    pub recipient: String,
}

impl Default for MailSettings {
    fn default() -> Self {
        let http = HttpMailerConfig::default();
        Self {
            backend: Backend::Http,
            endpoint: http.endpoint,
            api_key: None,
            timeout_ms: http.timeout_ms,
            sender: "sender@gmail.com".to_string(),
            recipient: "admin@gmail.com".to_string(),
        }
    }
}

impl MailSettings {
    pub fn build(&self) -> Result<Arc<dyn Mailer>, ConfigError> {
        match self.backend {
            Backend::Memory => Ok(Arc::new(RecordingMailer::new())),
            Backend::Http => {
                let mailer = HttpMailer::new(HttpMailerConfig {
                    endpoint: self.endpoint.clone(),
                    api_key: self.api_key.clone(),
                    timeout_ms: self.timeout_ms,
                })
                .map_err(|e| ConfigError::Build {
                    component: "mailer",
                    message: e.to_string(),
                })?;
                Ok(Arc::new(mailer))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub backend: Backend,
    pub url: String,
    pub api_key: String,
    pub timeout_ms: u64,
}

impl Default for ReportSettings {
    fn default() -> Self {
        let graphql = GraphQlScoreSourceConfig::default();
        Self {
            backend: Backend::Http,
            url: graphql.url,
            api_key: graphql.api_key,
            timeout_ms: graphql.timeout_ms,
        }
    }
}

impl ReportSettings {
    pub fn build(&self) -> Result<Arc<dyn ScoreSource>, ConfigError> {
        match self.backend {
            Backend::Memory => Ok(Arc::new(StaticScoreSource::default())),
            Backend::Http => {
                let source = GraphQlScoreSource::new(GraphQlScoreSourceConfig {
                    url: self.url.clone(),
                    api_key: self.api_key.clone(),
                    timeout_ms: self.timeout_ms,
                })
                .map_err(|e| ConfigError::Build {
                    component: "score source",
                    message: e.to_string(),
                })?;
                Ok(Arc::new(source))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderSettings {
    pub message: String,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            message: "Don't forget about your quiz!".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockSettings {
    /// Record timestamp offset, hours east of UTC
    pub utc_offset_hours: i32,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
        }
    }
}

impl ClockSettings {
    pub fn local_time(&self) -> Result<LocalTime, ConfigError> {
        LocalTime::new(self.utc_offset_hours).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "utc_offset_hours must be within -14..=14, got {}",
                self.utc_offset_hours
            ))
        })
    }
}

/// Limits applied by the edge function wrapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeSettings {
    pub max_body_size: usize,
    pub timeout_ms: u64,
}

impl Default for EdgeSettings {
    fn default() -> Self {
        Self {
            max_body_size: 64 * 1024,
            timeout_ms: 30_000,
        }
    }
}

impl StressConfig {
    /// Load from `path` (if any), overlay the process environment, validate
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_from(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file, picking the format from its extension
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();

        match extension.as_str() {
            "yaml" | "yml" => {
                serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            "toml" => toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string())),
            "json" => {
                serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Override fields from `STRESS_*` variables found by `lookup`
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(name: &str, value: String) -> Result<T, ConfigError> {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidEnv {
                    name: name.to_string(),
                    value,
                })
        }

        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(v) = var("STRESS_MODEL_LOCATION") {
            self.model.location = v;
        }
        if let Some(v) = var("STRESS_MODEL_SHA256") {
            self.model.sha256 = Some(v);
        }
        if let Some(v) = var("STRESS_MODEL_CACHE_PATH") {
            self.model.cache_path = Some(PathBuf::from(v));
        }

        if let Some(v) = var("STRESS_STORE_BACKEND") {
            self.store.backend = parsed("STRESS_STORE_BACKEND", v)?;
        }
        if let Some(v) = var("STRESS_STORE_ENDPOINT") {
            self.store.endpoint = v;
        }
        if let Some(v) = var("STRESS_STORE_TABLE") {
            self.store.table_name = v;
        }
        if let Some(v) = var("STRESS_STORE_API_KEY") {
            self.store.api_key = Some(v);
        }

        if let Some(v) = var("STRESS_PUBLISH_BACKEND") {
            self.publisher.backend = parsed("STRESS_PUBLISH_BACKEND", v)?;
        }
        if let Some(v) = var("STRESS_PUBLISH_ENDPOINT") {
            self.publisher.endpoint = v;
        }
        if let Some(v) = var("STRESS_PUBLISH_API_KEY") {
            self.publisher.api_key = Some(v);
        }

        if let Some(v) = var("STRESS_MAIL_BACKEND") {
            self.mail.backend = parsed("STRESS_MAIL_BACKEND", v)?;
        }
        if let Some(v) = var("STRESS_MAIL_ENDPOINT") {
            self.mail.endpoint = v;
        }
        if let Some(v) = var("STRESS_MAIL_API_KEY") {
            self.mail.api_key = Some(v);
        }
        if let Some(v) = var("STRESS_MAIL_SENDER") {
            self.mail.sender = v;
        }
        if let Some(v) = var("STRESS_MAIL_RECIPIENT") {
            self.mail.recipient = v;
        }

        if let Some(v) = var("STRESS_REPORT_BACKEND") {
            self.report.backend = parsed("STRESS_REPORT_BACKEND", v)?;
        }
        if let Some(v) = var("STRESS_REPORT_URL") {
            self.report.url = v;
        }
        if let Some(v) = var("STRESS_REPORT_API_KEY") {
            self.report.api_key = v;
        }

        if let Some(v) = var("STRESS_REMINDER_MESSAGE") {
            self.reminder.message = v;
        }
        if let Some(v) = var("STRESS_UTC_OFFSET_HOURS") {
            self.clock.utc_offset_hours = parsed("STRESS_UTC_OFFSET_HOURS", v)?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.clock.local_time()?;

        for (name, address) in [
            ("mail.sender", &self.mail.sender),
            ("mail.recipient", &self.mail.recipient),
        ] {
            if !address.contains('@') {
                return Err(ConfigError::Invalid(format!(
                    "{} is not an email address: '{}'",
                    name, address
                )));
            }
        }

        for (name, topic) in [
            ("publisher.prediction_topic", &self.publisher.prediction_topic),
            ("publisher.reminder_topic", &self.publisher.reminder_topic),
        ] {
            if topic.is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", name)));
            }
        }

        if self.edge.max_body_size == 0 || self.edge.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "edge limits must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
