//! Prediction pipeline
//!
//! One invocation runs four stages in order: read the sensor event, classify
//! it, persist the record, publish the level to the device. A stage only runs
//! when every earlier stage succeeded, so a failure never leaves a publish
//! without a record behind it.
//!
//! The edge wrapper's timeout cancels an invocation from outside the
//! pipeline. Its `TIMEOUT` envelope carries no stage, so a timeout that
//! fires while publishing leaves the record stored without saying so; the
//! record id (the request id) is the way to check.

use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

use stress_core::clock::{Clock, LocalTime, SystemClock};
use stress_core::contracts::{
    HandlerResponse, InputError, NotificationPayload, SensorReading, StressLevel, StressRecord,
};
use stress_core::inference::{InferenceError, InferenceProvider};
use stress_core::publish::{
    NotificationPublisher, PublishError, QualityOfService, PREDICTION_TOPIC,
};
use stress_core::store::{RecordStore, StoreError};

/// Pipeline stage, as reported in failure bodies and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Input,
    Inference,
    Storage,
    Publish,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Input => "input",
            Stage::Inference => "inference",
            Stage::Storage => "storage",
            Stage::Publish => "publish",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one invocation, tagged with the stage that failed
///
/// The display text is the collaborator's own error text, prefixed with its
/// kind (`ConnectionError: ...`, `InputError: ...`).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Storage(#[from] StoreError),

    /// The record was written before publishing failed
    #[error("{source}")]
    Publish {
        record_id: String,
        #[source]
        source: PublishError,
    },
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Input(_) => Stage::Input,
            PipelineError::Inference(_) => Stage::Inference,
            PipelineError::Storage(_) => Stage::Storage,
            PipelineError::Publish { .. } => Stage::Publish,
        }
    }

    /// Whether the store write already happened
    pub fn record_persisted(&self) -> bool {
        matches!(self, PipelineError::Publish { .. })
    }

    /// Failure body: `{error, stage, recordPersisted}`
    pub fn to_body(&self) -> Value {
        json!({
            "error": self.to_string(),
            "stage": self.stage().as_str(),
            "recordPersisted": self.record_persisted(),
        })
    }
}

/// Result of a successful invocation
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionOutcome {
    pub stress_level: StressLevel,
    pub record: StressRecord,
}

/// The prediction function with its collaborators
pub struct StressPipeline {
    inference: Arc<dyn InferenceProvider>,
    store: Arc<dyn RecordStore>,
    publisher: Arc<dyn NotificationPublisher>,
    clock: Arc<dyn Clock>,
    local_time: LocalTime,
    topic: String,
    qos: QualityOfService,
}

impl StressPipeline {
    pub fn new(
        inference: Arc<dyn InferenceProvider>,
        store: Arc<dyn RecordStore>,
        publisher: Arc<dyn NotificationPublisher>,
    ) -> Self {
        Self {
            inference,
            store,
            publisher,
            clock: Arc::new(SystemClock),
            local_time: LocalTime::default(),
            topic: PREDICTION_TOPIC.to_string(),
            qos: QualityOfService::AtLeastOnce,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_local_time(mut self, local_time: LocalTime) -> Self {
        self.local_time = local_time;
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn with_qos(mut self, qos: QualityOfService) -> Self {
        self.qos = qos;
        self
    }

    pub fn model_id(&self) -> &str {
        self.inference.model_id()
    }

    /// Classify, persist and publish one reading
    pub async fn run(
        &self,
        reading: &SensorReading,
        request_id: &str,
    ) -> Result<PredictionOutcome, PipelineError> {
        let stress_level = self.inference.predict(&reading.features()).map_err(|e| {
            tracing::error!(request_id = %request_id, error = %e, "Inference failed");
            e
        })?;
        tracing::info!(
            request_id = %request_id,
            model_id = %self.inference.model_id(),
            stress_level = stress_level.as_i64(),
            "Stress level predicted"
        );

        let time = self.local_time.format(self.clock.now_utc());
        let record = StressRecord::new(request_id, reading, stress_level, time);

        self.store.put_new(&record).await.map_err(|e| {
            tracing::error!(request_id = %request_id, error = %e, "Failed to store record");
            e
        })?;
        tracing::info!(request_id = %request_id, time = %record.time, "Record stored");

        let payload = serde_json::to_value(NotificationPayload::new(stress_level)).map_err(|e| {
            PipelineError::Publish {
                record_id: record.id.clone(),
                source: PublishError::Serialization(e.to_string()),
            }
        })?;

        if let Err(source) = self.publisher.publish(&self.topic, &payload, self.qos).await {
            tracing::warn!(
                request_id = %request_id,
                topic = %self.topic,
                error = %source,
                "Publish failed after the record was stored"
            );
            return Err(PipelineError::Publish {
                record_id: record.id.clone(),
                source,
            });
        }
        tracing::info!(
            request_id = %request_id,
            topic = %self.topic,
            qos = self.qos.level(),
            "Stress level published"
        );

        Ok(PredictionOutcome {
            stress_level,
            record,
        })
    }

    /// Read the sensor fields from an untyped event, then [`run`](Self::run)
    pub async fn run_event(
        &self,
        event: &Value,
        request_id: &str,
    ) -> Result<PredictionOutcome, PipelineError> {
        let reading = SensorReading::from_event(event).map_err(|e| {
            tracing::warn!(request_id = %request_id, error = %e, "Rejected event");
            e
        })?;
        self.run(&reading, request_id).await
    }

    /// Map a pipeline result onto the response envelope
    pub fn response_for(result: &Result<PredictionOutcome, PipelineError>) -> HandlerResponse {
        match result {
            Ok(outcome) => HandlerResponse::ok(json!({ "stressLevel": outcome.stress_level })),
            Err(e) => HandlerResponse::failure(e.to_body()),
        }
    }

    /// Function entry point: never fails, errors become a 500 envelope
    pub async fn handle(&self, event: &Value, request_id: &str) -> HandlerResponse {
        Self::response_for(&self.run_event(event, request_id).await)
    }
}
