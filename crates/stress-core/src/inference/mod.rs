//! Stress classification
//!
//! The classifier is a pre-trained random forest shipped as a JSON artifact.
//! It is loaded once per process through [`ModelLoader`] and then shared
//! read-only behind an `Arc`; prediction itself is a pure function.

mod forest;
mod loader;

pub use forest::*;
pub use loader::*;

use thiserror::Error;

use crate::contracts::{StressLevel, FEATURE_COUNT};

/// Errors raised while predicting
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("InferenceError: feature {index} is not finite ({value})")]
    NonFiniteFeature { index: usize, value: f64 },

    #[error("InferenceError: model predicted unknown class {0}")]
    UnknownClass(i64),

    #[error("InferenceError: {0}")]
    Model(String),
}

/// Maps an ordered feature vector to a stress level
///
/// Implementations must be safe to share across concurrent invocations.
pub trait InferenceProvider: Send + Sync {
    /// Identifier of the loaded model, for logs
    fn model_id(&self) -> &str;

    fn predict(&self, features: &[f64; FEATURE_COUNT]) -> Result<StressLevel, InferenceError>;
}

/// Reject NaN and infinities before they reach the model
pub(crate) fn check_features(features: &[f64; FEATURE_COUNT]) -> Result<(), InferenceError> {
    for (index, value) in features.iter().copied().enumerate() {
        if !value.is_finite() {
            return Err(InferenceError::NonFiniteFeature { index, value });
        }
    }
    Ok(())
}
