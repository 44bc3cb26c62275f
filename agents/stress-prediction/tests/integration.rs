//! Integration tests for the Stress Prediction function

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, NaiveDateTime, TimeZone, Utc};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stress_core::clock::FixedClock;
use stress_core::config::{Backend, EdgeSettings, StressConfig};
use stress_core::contracts::{AttributeValue, SensorReading, StressLevel, StressRecord};
use stress_core::edge::{handle_request, response_json, REQUEST_ID_HEADER};
use stress_core::inference::{ForestModel, InferenceError, InferenceProvider};
use stress_core::publish::{
    NotificationPublisher, PublishError, QualityOfService, RecordingPublisher,
};
use stress_core::store::{InMemoryRecordStore, RecordStore, StoreError};
use stress_core::telemetry::{FunctionMetrics, Outcome};
use stress_prediction::{bootstrap, create_router, AppState, Stage, StressPipeline};

fn model_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../models/stress_model.json")
}

fn load_model() -> Arc<ForestModel> {
    let bytes = std::fs::read(model_path()).unwrap();
    Arc::new(ForestModel::from_slice(&bytes).unwrap())
}

/// Provider that always answers the same level and counts calls
struct ScriptedModel {
    level: StressLevel,
    calls: AtomicUsize,
}

impl ScriptedModel {
    fn new(level: StressLevel) -> Self {
        Self {
            level,
            calls: AtomicUsize::new(0),
        }
    }
}

impl InferenceProvider for ScriptedModel {
    fn model_id(&self) -> &str {
        "scripted"
    }

    fn predict(&self, _features: &[f64; 3]) -> Result<StressLevel, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.level)
    }
}

struct BrokenModel;

impl InferenceProvider for BrokenModel {
    fn model_id(&self) -> &str {
        "broken"
    }

    fn predict(&self, _features: &[f64; 3]) -> Result<StressLevel, InferenceError> {
        Err(InferenceError::Model("feature shape mismatch".to_string()))
    }
}

struct FailingStore(StoreError);

#[async_trait]
impl RecordStore for FailingStore {
    async fn put_new(&self, _record: &StressRecord) -> Result<(), StoreError> {
        Err(self.0.clone())
    }
}

struct FailingPublisher;

#[async_trait]
impl NotificationPublisher for FailingPublisher {
    async fn publish(
        &self,
        _topic: &str,
        _payload: &Value,
        _qos: QualityOfService,
    ) -> Result<(), PublishError> {
        Err(PublishError::Connection("broker unreachable".to_string()))
    }
}

fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 3, 10, 8, 15, 42).unwrap()))
}

fn scenario_event() -> Value {
    json!({"eda": 0.5, "heart_rate": 80, "temperature": 36.6})
}

#[tokio::test]
async fn test_scenario_low_stress() {
    let model = Arc::new(ScriptedModel::new(StressLevel::Low));
    let store = Arc::new(InMemoryRecordStore::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let pipeline = StressPipeline::new(model.clone(), store.clone(), publisher.clone())
        .with_clock(fixed_clock());

    let response = pipeline.handle(&scenario_event(), "req-abc").await;

    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"statusCode": 200, "body": {"stressLevel": 1}})
    );
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);

    assert_eq!(store.len(), 1);
    let record = store.get("req-abc").unwrap();
    assert_eq!(record.eda, 0.5);
    assert_eq!(record.heart_rate, 80.0);
    assert_eq!(record.temperature, 36.6);
    assert_eq!(record.time, "2024-03-10 11:15:42");

    let item = record.to_item();
    assert_eq!(item["id"], AttributeValue::S("req-abc".to_string()));
    assert_eq!(item["stressLevel"], AttributeValue::N("1".to_string()));
    assert_eq!(item["heart_rate"], AttributeValue::N("80".to_string()));

    let messages = publisher.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].topic, "esp32/sub");
    assert_eq!(messages[0].payload, json!({"stressLevel": 1}));
    assert_eq!(messages[0].qos.level(), 1);
}

#[tokio::test]
async fn test_response_level_matches_model_for_every_level() {
    for level in StressLevel::ALL {
        let publisher = Arc::new(RecordingPublisher::new());
        let pipeline = StressPipeline::new(
            Arc::new(ScriptedModel::new(level)),
            Arc::new(InMemoryRecordStore::new()),
            publisher.clone(),
        );

        let response = pipeline.handle(&scenario_event(), "req").await;
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body["stressLevel"], level.as_i64());
        assert_eq!(publisher.messages()[0].payload["stressLevel"], level.as_i64());
    }
}

#[tokio::test]
async fn test_record_time_is_three_hours_ahead_of_utc() {
    let store = Arc::new(InMemoryRecordStore::new());
    let pipeline = StressPipeline::new(
        Arc::new(ScriptedModel::new(StressLevel::None)),
        store.clone(),
        Arc::new(RecordingPublisher::new()),
    );

    let before = Utc::now() + Duration::hours(3) - Duration::seconds(1);
    pipeline.handle(&scenario_event(), "req-time").await;
    let after = Utc::now() + Duration::hours(3) + Duration::seconds(1);

    let time = store.get("req-time").unwrap().time;
    let stamped = NaiveDateTime::parse_from_str(&time, "%Y-%m-%d %H:%M:%S").unwrap();
    assert!(stamped >= before.naive_utc() && stamped <= after.naive_utc());
}

#[tokio::test]
async fn test_forest_artifact_drives_prediction() {
    let store = Arc::new(InMemoryRecordStore::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let pipeline = StressPipeline::new(load_model(), store.clone(), publisher.clone());

    let low = pipeline
        .run(&SensorReading::new(0.5, 80.0, 36.6), "req-low")
        .await
        .unwrap();
    let none = pipeline
        .run(&SensorReading::new(0.5, 60.0, 36.6), "req-none")
        .await
        .unwrap();
    let high = pipeline
        .run(&SensorReading::new(3.0, 120.0, 38.0), "req-high")
        .await
        .unwrap();

    assert_eq!(low.stress_level, StressLevel::Low);
    assert_eq!(none.stress_level, StressLevel::None);
    assert_eq!(high.stress_level, StressLevel::High);
    assert_eq!(store.len(), 3);
    assert_eq!(publisher.messages().len(), 3);
}

#[tokio::test]
async fn test_inference_failure_skips_store_and_publish() {
    let store = Arc::new(InMemoryRecordStore::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let pipeline = StressPipeline::new(Arc::new(BrokenModel), store.clone(), publisher.clone());

    let response = pipeline.handle(&scenario_event(), "req-broken").await;

    assert_eq!(response.status_code, 500);
    assert_eq!(response.body["stage"], "inference");
    assert_eq!(response.body["recordPersisted"], false);
    assert!(response.body["error"]
        .as_str()
        .unwrap()
        .contains("feature shape mismatch"));
    assert!(store.is_empty());
    assert!(publisher.messages().is_empty());
}

#[tokio::test]
async fn test_store_connection_error_skips_publish() {
    let publisher = Arc::new(RecordingPublisher::new());
    let pipeline = StressPipeline::new(
        Arc::new(ScriptedModel::new(StressLevel::Low)),
        Arc::new(FailingStore(StoreError::Connection(
            "could not reach table StressPredictionScores".to_string(),
        ))),
        publisher.clone(),
    );

    let response = pipeline.handle(&scenario_event(), "req-store").await;

    assert_eq!(response.status_code, 500);
    let error = response.body["error"].as_str().unwrap();
    assert!(error.starts_with("ConnectionError: "));
    assert_eq!(response.body["stage"], "storage");
    assert_eq!(response.body["recordPersisted"], false);
    assert!(publisher.messages().is_empty());
}

#[tokio::test]
async fn test_publish_failure_keeps_record() {
    let store = Arc::new(InMemoryRecordStore::new());
    let pipeline = StressPipeline::new(
        Arc::new(ScriptedModel::new(StressLevel::High)),
        store.clone(),
        Arc::new(FailingPublisher),
    );

    let result = pipeline
        .run(&SensorReading::new(2.5, 115.0, 37.9), "req-publish")
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.stage(), Stage::Publish);
    assert!(err.record_persisted());
    assert_eq!(err.to_body()["error"], "ConnectionError: broker unreachable");
    assert_eq!(
        store.get("req-publish").unwrap().stress_level,
        StressLevel::High
    );
}

#[tokio::test]
async fn test_duplicate_request_id_is_rejected() {
    let store = Arc::new(InMemoryRecordStore::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let pipeline = StressPipeline::new(
        Arc::new(ScriptedModel::new(StressLevel::Low)),
        store.clone(),
        publisher.clone(),
    );

    assert!(pipeline.handle(&scenario_event(), "req-dup").await.is_success());
    let second = pipeline
        .handle(&json!({"eda": 9.0, "heart_rate": 150, "temperature": 39.0}), "req-dup")
        .await;

    assert_eq!(second.status_code, 500);
    assert_eq!(second.body["stage"], "storage");
    assert!(second.body["error"]
        .as_str()
        .unwrap()
        .starts_with("ConditionalCheckFailedException"));
    assert_eq!(store.get("req-dup").unwrap().eda, 0.5);
    assert_eq!(publisher.messages().len(), 1);
}

#[tokio::test]
async fn test_concurrent_invocations_share_model() {
    let store = Arc::new(InMemoryRecordStore::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let pipeline = Arc::new(StressPipeline::new(
        load_model(),
        store.clone(),
        publisher.clone(),
    ));

    let mut handles = Vec::new();
    for i in 0..8 {
        let pipeline = pipeline.clone();
        handles.push(tokio::spawn(async move {
            let event = json!({"eda": 0.5, "heart_rate": 60 + i * 10, "temperature": 36.6});
            pipeline.handle(&event, &format!("req-{}", i)).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_success());
    }

    assert_eq!(store.len(), 8);
    assert_eq!(publisher.messages().len(), 8);
}

fn memory_state() -> (AppState, Arc<InMemoryRecordStore>, Arc<RecordingPublisher>) {
    let store = Arc::new(InMemoryRecordStore::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let pipeline = StressPipeline::new(
        Arc::new(ScriptedModel::new(StressLevel::Low)),
        store.clone(),
        publisher.clone(),
    )
    .with_clock(fixed_clock());
    let state = AppState::new(pipeline, FunctionMetrics::new("stress-prediction").unwrap());
    (state, store, publisher)
}

fn invoke_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/invoke")
        .header("content-type", "application/json")
        .header(REQUEST_ID_HEADER, "lambda-req-7")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_router_invoke_uses_request_id() {
    let (state, store, _publisher) = memory_state();
    let router = create_router(state.clone());

    let response = handle_request(
        router,
        invoke_request(&scenario_event().to_string()),
        &EdgeSettings::default(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[REQUEST_ID_HEADER], "lambda-req-7");
    let body = response_json(response).await.unwrap();
    assert_eq!(body, json!({"statusCode": 200, "body": {"stressLevel": 1}}));

    assert!(store.get("lambda-req-7").is_some());
    assert_eq!(state.metrics.invocations(Outcome::Success), 1);
    assert_eq!(state.metrics.predictions(StressLevel::Low), 1);
}

#[tokio::test]
async fn test_router_rejects_malformed_body() {
    let (state, store, publisher) = memory_state();
    let router = create_router(state.clone());

    let response = router.oneshot(invoke_request("{not json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response_json(response).await.unwrap();
    assert_eq!(body["statusCode"], 500);
    assert_eq!(body["body"]["stage"], "input");
    assert!(body["body"]["error"]
        .as_str()
        .unwrap()
        .starts_with("InputError: event is not valid JSON"));
    assert!(store.is_empty());
    assert!(publisher.messages().is_empty());
    assert_eq!(state.metrics.invocations(Outcome::Failure("input")), 1);
}

#[tokio::test]
async fn test_router_health_and_metrics() {
    let (state, _store, _publisher) = memory_state();
    let router = create_router(state);

    let health = router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    let body = response_json(health).await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["function"], "stress-prediction");

    router
        .clone()
        .oneshot(invoke_request(&scenario_event().to_string()))
        .await
        .unwrap();

    let metrics = router
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(metrics.status(), StatusCode::OK);
    let text = axum::body::to_bytes(metrics.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(text.to_vec()).unwrap();
    assert!(text.contains("stress_invocations_total"));
    assert!(text.contains("stress_predictions_total"));
}

#[tokio::test]
async fn test_bootstrap_from_config() {
    let mut config = StressConfig::default();
    config.model.location = model_path().display().to_string();
    config.store.backend = Backend::Memory;
    config.publisher.backend = Backend::Memory;

    let state = bootstrap(&config).await.unwrap();
    assert_eq!(state.pipeline.model_id(), "stress-forest");

    let response = state.pipeline.handle(&scenario_event(), "boot-1").await;
    assert_eq!(response.body, json!({"stressLevel": 1}));
}

#[tokio::test]
async fn test_bootstrap_fails_on_missing_model() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = StressConfig::default();
    config.model.location = dir.path().join("absent.json").display().to_string();
    config.store.backend = Backend::Memory;
    config.publisher.backend = Backend::Memory;

    assert!(matches!(
        bootstrap(&config).await,
        Err(stress_prediction::StartupError::Model(_))
    ));
}

#[tokio::test]
async fn test_oversized_body_without_length_gets_envelope() {
    let (state, store, publisher) = memory_state();
    let settings = EdgeSettings {
        max_body_size: 32,
        ..Default::default()
    };
    let padded = json!({
        "eda": 0.5,
        "heart_rate": 80,
        "temperature": 36.6,
        "note": "x".repeat(80)
    });
    let request = Request::builder()
        .method("POST")
        .uri("/invoke")
        .body(Body::from(padded.to_string()))
        .unwrap();

    let response = handle_request(create_router(state.clone()), request, &settings).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = response_json(response).await.unwrap();
    assert_eq!(body["statusCode"], 413);
    assert_eq!(body["body"]["code"], "BODY_TOO_LARGE");
    assert!(store.is_empty());
    assert!(publisher.messages().is_empty());
    assert_eq!(state.metrics.invocations(Outcome::Failure("input")), 1);
}

struct HangingPublisher;

#[async_trait]
impl NotificationPublisher for HangingPublisher {
    async fn publish(
        &self,
        _topic: &str,
        _payload: &Value,
        _qos: QualityOfService,
    ) -> Result<(), PublishError> {
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        Ok(())
    }
}

#[tokio::test]
async fn test_wrapper_timeout_during_publish_leaves_record() {
    let store = Arc::new(InMemoryRecordStore::new());
    let pipeline = StressPipeline::new(
        Arc::new(ScriptedModel::new(StressLevel::Low)),
        store.clone(),
        Arc::new(HangingPublisher),
    );
    let state = AppState::new(pipeline, FunctionMetrics::new("stress-prediction").unwrap());
    let settings = EdgeSettings {
        timeout_ms: 50,
        ..Default::default()
    };

    let response = handle_request(
        create_router(state),
        invoke_request(&scenario_event().to_string()),
        &settings,
    )
    .await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let body = response_json(response).await.unwrap();
    assert_eq!(body["body"]["code"], "TIMEOUT");
    // The timeout envelope carries no stage; the stored record is the evidence
    assert!(store.get("lambda-req-7").is_some());
}

#[tokio::test]
async fn test_end_to_end_over_http() {
    let table = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-Amz-Target", "DynamoDB_20120810.PutItem"))
        .and(body_partial_json(json!({
            "TableName": "StressPredictionScores",
            "Item": {
                "id": {"S": "e2e-1"},
                "stressLevel": {"N": "1"},
                "heart_rate": {"N": "80"}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&table)
        .await;

    let broker = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/topics/esp32%2Fsub"))
        .and(query_param("qos", "1"))
        .and(body_json(json!({"stressLevel": 1})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&broker)
        .await;

    let mut config = StressConfig::default();
    config.model.location = model_path().display().to_string();
    config.store.backend = Backend::Http;
    config.store.endpoint = table.uri();
    config.publisher.backend = Backend::Http;
    config.publisher.endpoint = broker.uri();

    let state = bootstrap(&config).await.unwrap();
    let response = state.pipeline.handle(&scenario_event(), "e2e-1").await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, json!({"stressLevel": 1}));
}

#[tokio::test]
async fn test_table_outage_over_http_skips_publish() {
    let table = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "__type": "com.amazonaws.dynamodb.v20120810#InternalServerError",
            "message": "Internal server error"
        })))
        .mount(&table)
        .await;

    let broker = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&broker)
        .await;

    let mut config = StressConfig::default();
    config.model.location = model_path().display().to_string();
    config.store.endpoint = table.uri();
    config.publisher.endpoint = broker.uri();

    let state = bootstrap(&config).await.unwrap();
    let response = state.pipeline.handle(&scenario_event(), "e2e-2").await;

    assert_eq!(response.status_code, 500);
    assert_eq!(response.body["stage"], "storage");
    assert_eq!(response.body["recordPersisted"], false);
}
