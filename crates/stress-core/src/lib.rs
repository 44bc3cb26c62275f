//! Stress Monitor core
//!
//! Shared building blocks for the Stress Monitor cloud functions: the
//! request/record contracts, the fixed-offset clock, the stress classifier,
//! and the external collaborators each function talks to.
//!
//! ## Architecture
//!
//! 1. **Contracts** (`contracts/`): sensor input, stress records, published
//!    payloads and the function response envelope.
//! 2. **Clock** (`clock`): wall-clock access and the fixed UTC offset used to
//!    timestamp records.
//! 3. **Inference** (`inference/`): random-forest classifier and its one-time
//!    loader.
//! 4. **Collaborators** (`store`, `publish`, `mail`, `scores`): traits at the
//!    seams plus HTTP and in-memory implementations.
//! 5. **Config** / **Telemetry**: serde-backed configuration, tracing setup
//!    and Prometheus metrics.
//! 6. **Edge** (`edge`): the HTTP wrapper every function is served through.
//!
//! All collaborators are passed in explicitly; nothing here holds ambient
//! global state.

pub mod clock;
pub mod config;
pub mod contracts;
pub mod edge;
pub mod inference;
pub mod mail;
pub mod publish;
pub mod scores;
pub mod store;
pub mod telemetry;

pub use clock::{Clock, FixedClock, LocalTime, SystemClock};
pub use config::{Backend, ConfigError, StressConfig};
pub use contracts::{
    HandlerResponse, InputError, NotificationPayload, ReminderPayload, SensorReading,
    StressLevel, StressRecord,
};
pub use inference::{
    ForestModel, InferenceError, InferenceProvider, ModelLoadError, ModelLoader, ModelLoaderConfig,
    ModelSource,
};
pub use mail::{EmailMessage, MailError, Mailer, RecordingMailer};
pub use publish::{NotificationPublisher, PublishError, QualityOfService, RecordingPublisher};
pub use scores::{QueryError, ScoreItem, ScoreSource, StaticScoreSource};
pub use store::{InMemoryRecordStore, RecordStore, StoreError};
pub use telemetry::{FunctionMetrics, Outcome};

/// Workspace version (from Cargo.toml)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
