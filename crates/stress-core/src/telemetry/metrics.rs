//! Prometheus metrics for the stress functions
//!
//! - `stress_invocations_total` (counter) - invocations by function, outcome and failing stage
//! - `stress_invocation_duration_seconds` (histogram) - end-to-end invocation time
//! - `stress_predictions_total` (counter) - predicted levels

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::time::Duration;

use crate::contracts::StressLevel;

/// Invocation result as recorded in metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Failed in the named stage
    Failure(&'static str),
}

impl Outcome {
    fn labels(self) -> (&'static str, &'static str) {
        match self {
            Outcome::Success => ("success", "none"),
            Outcome::Failure(stage) => ("failure", stage),
        }
    }
}

/// Metrics for one function process, on their own registry
pub struct FunctionMetrics {
    function: String,
    registry: Registry,
    invocations_total: CounterVec,
    duration_seconds: HistogramVec,
    predictions_total: CounterVec,
}

impl FunctionMetrics {
    pub fn new(function: impl Into<String>) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let invocations_total = CounterVec::new(
            Opts::new("invocations_total", "Total function invocations").namespace("stress"),
            &["function", "outcome", "stage"],
        )?;

        let duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "invocation_duration_seconds",
                "Function invocation duration in seconds",
            )
            .namespace("stress")
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["function"],
        )?;

        let predictions_total = CounterVec::new(
            Opts::new("predictions_total", "Predicted stress levels").namespace("stress"),
            &["level"],
        )?;

        registry.register(Box::new(invocations_total.clone()))?;
        registry.register(Box::new(duration_seconds.clone()))?;
        registry.register(Box::new(predictions_total.clone()))?;

        Ok(Self {
            function: function.into(),
            registry,
            invocations_total,
            duration_seconds,
            predictions_total,
        })
    }

    pub fn record_invocation(&self, outcome: Outcome, elapsed: Duration) {
        let (result, stage) = outcome.labels();
        self.invocations_total
            .with_label_values(&[self.function.as_str(), result, stage])
            .inc();
        self.duration_seconds
            .with_label_values(&[self.function.as_str()])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_prediction(&self, level: StressLevel) {
        self.predictions_total
            .with_label_values(&[level.to_string().as_str()])
            .inc();
    }

    pub fn invocations(&self, outcome: Outcome) -> u64 {
        let (result, stage) = outcome.labels();
        self.invocations_total
            .with_label_values(&[self.function.as_str(), result, stage])
            .get() as u64
    }

    pub fn predictions(&self, level: StressLevel) -> u64 {
        self.predictions_total
            .with_label_values(&[level.to_string().as_str()])
            .get() as u64
    }

    /// Text exposition of all metrics
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
