use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{SensorReading, StressLevel};

/// One persisted prediction, written once per successful invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressRecord {
    /// Request identifier supplied by the invoking environment
    pub id: String,
    pub eda: f64,
    pub heart_rate: f64,
    pub temperature: f64,
    #[serde(rename = "stressLevel")]
    pub stress_level: StressLevel,
    /// Invocation time at the fixed offset, `YYYY-MM-DD HH:MM:SS`
    pub time: String,
}

impl StressRecord {
    pub fn new(
        id: impl Into<String>,
        reading: &SensorReading,
        stress_level: StressLevel,
        time: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            eda: reading.eda,
            heart_rate: reading.heart_rate,
            temperature: reading.temperature,
            stress_level,
            time: time.into(),
        }
    }

    /// Key-value store item in attribute-value form
    ///
    /// Numbers travel as `{"N": "<decimal string>"}`, strings as `{"S": ...}`.
    pub fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert("id".to_string(), AttributeValue::S(self.id.clone()));
        item.insert("eda".to_string(), AttributeValue::number(self.eda));
        item.insert("heart_rate".to_string(), AttributeValue::number(self.heart_rate));
        item.insert("temperature".to_string(), AttributeValue::number(self.temperature));
        item.insert(
            "stressLevel".to_string(),
            AttributeValue::N(self.stress_level.to_string()),
        );
        item.insert("time".to_string(), AttributeValue::S(self.time.clone()));
        item
    }
}

/// Store item keyed by attribute name
pub type Item = BTreeMap<String, AttributeValue>;

/// Typed attribute value as the record store expects it on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    S(String),
    N(String),
}

impl AttributeValue {
    pub fn number(value: f64) -> Self {
        AttributeValue::N(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        match self {
            AttributeValue::S(s) | AttributeValue::N(s) => s,
        }
    }
}
