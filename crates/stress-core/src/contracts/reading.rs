use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Number of features the classifier expects
pub const FEATURE_COUNT: usize = 3;

/// Field names in feature order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = ["eda", "heart_rate", "temperature"];

/// Raw sensor features sent by the wearable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Electrodermal activity
    pub eda: f64,
    /// Heart rate in beats per minute
    pub heart_rate: f64,
    /// Skin temperature in degrees Celsius
    pub temperature: f64,
}

/// Reasons an incoming event cannot be turned into a [`SensorReading`]
///
/// Only structural problems are reported; value ranges are not checked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("InputError: event is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("InputError: event must be a JSON object")]
    NotAnObject,

    #[error("InputError: missing field '{0}'")]
    MissingField(&'static str),

    #[error("InputError: field '{0}' is not a number")]
    NotNumeric(&'static str),

    #[error("InputError: field '{0}' is not a finite number")]
    NotFinite(&'static str),
}

impl SensorReading {
    pub fn new(eda: f64, heart_rate: f64, temperature: f64) -> Self {
        Self {
            eda,
            heart_rate,
            temperature,
        }
    }

    /// Extract and check the three features from an untyped event
    pub fn from_event(event: &Value) -> Result<Self, InputError> {
        let object = event.as_object().ok_or(InputError::NotAnObject)?;

        let mut values = [0.0; FEATURE_COUNT];
        for (slot, name) in values.iter_mut().zip(FEATURE_NAMES) {
            let raw = object.get(name).ok_or(InputError::MissingField(name))?;
            let number = raw.as_f64().ok_or(InputError::NotNumeric(name))?;
            if !number.is_finite() {
                return Err(InputError::NotFinite(name));
            }
            *slot = number;
        }

        let [eda, heart_rate, temperature] = values;
        Ok(Self::new(eda, heart_rate, temperature))
    }

    /// Parse raw event bytes, then extract the features
    pub fn from_slice(bytes: &[u8]) -> Result<Self, InputError> {
        let event: Value =
            serde_json::from_slice(bytes).map_err(|e| InputError::InvalidJson(e.to_string()))?;
        Self::from_event(&event)
    }

    /// Ordered feature vector `[eda, heart_rate, temperature]`
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [self.eda, self.heart_rate, self.temperature]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_event_accepts_integers_and_floats() {
        let reading =
            SensorReading::from_event(&json!({"eda": 0.5, "heart_rate": 80, "temperature": 36.6}))
                .unwrap();
        assert_eq!(reading.features(), [0.5, 80.0, 36.6]);
    }

    #[test]
    fn test_from_event_ignores_extra_fields() {
        let reading = SensorReading::from_event(
            &json!({"eda": 1.0, "heart_rate": 70.0, "temperature": 36.0, "device": "esp32"}),
        )
        .unwrap();
        assert_eq!(reading.heart_rate, 70.0);
    }

    #[test]
    fn test_from_event_missing_field() {
        let err = SensorReading::from_event(&json!({"eda": 0.5, "temperature": 36.6})).unwrap_err();
        assert_eq!(err, InputError::MissingField("heart_rate"));
        assert_eq!(err.to_string(), "InputError: missing field 'heart_rate'");
    }

    #[test]
    fn test_from_event_non_numeric_field() {
        let err = SensorReading::from_event(
            &json!({"eda": "high", "heart_rate": 80, "temperature": 36.6}),
        )
        .unwrap_err();
        assert_eq!(err, InputError::NotNumeric("eda"));
    }

    #[test]
    fn test_from_event_rejects_non_object() {
        assert_eq!(
            SensorReading::from_event(&json!([0.5, 80, 36.6])).unwrap_err(),
            InputError::NotAnObject
        );
    }

    #[test]
    fn test_out_of_range_values_are_not_rejected() {
        let reading = SensorReading::from_event(
            &json!({"eda": -3.0, "heart_rate": 400, "temperature": -10}),
        )
        .unwrap();
        assert_eq!(reading.temperature, -10.0);
    }
}
