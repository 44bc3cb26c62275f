use serde::{Deserialize, Serialize};

use super::{check_features, InferenceError, InferenceProvider, ModelLoadError};
use crate::contracts::{StressLevel, FEATURE_COUNT};

/// Random-forest classifier artifact
///
/// Each tree is a flat node array rooted at index 0. Split nodes send a
/// sample left when `features[feature] <= threshold`; leaf nodes carry
/// per-class weights in `classes` order. Children always sit at a higher
/// index than their parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    #[serde(default = "default_model_id")]
    pub model_id: String,
    pub n_features: usize,
    /// Class labels, in the column order used by leaf weights
    pub classes: Vec<i64>,
    pub trees: Vec<DecisionTree>,
}

fn default_model_id() -> String {
    "stress-forest".to_string()
}

/// One tree of the forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

impl ForestModel {
    /// Parse and validate an artifact
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ModelLoadError> {
        let model: ForestModel = serde_json::from_slice(bytes)
            .map_err(|e| ModelLoadError::Parse(e.to_string()))?;
        model.validate()?;
        Ok(model)
    }

    /// Structural checks so that prediction can never index out of bounds
    pub fn validate(&self) -> Result<(), ModelLoadError> {
        if self.n_features != FEATURE_COUNT {
            return Err(ModelLoadError::Invalid(format!(
                "model expects {} features, handler supplies {}",
                self.n_features, FEATURE_COUNT
            )));
        }
        if self.classes.is_empty() {
            return Err(ModelLoadError::Invalid("model has no classes".to_string()));
        }
        if let Some(bad) = self
            .classes
            .iter()
            .find(|c| StressLevel::try_from(**c).is_err())
        {
            return Err(ModelLoadError::Invalid(format!(
                "class label {} is not a stress level",
                bad
            )));
        }
        if self.trees.is_empty() {
            return Err(ModelLoadError::Invalid("model has no trees".to_string()));
        }

        for (tree_index, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.classes.len())
                .map_err(|msg| ModelLoadError::Invalid(format!("tree {}: {}", tree_index, msg)))?;
        }

        Ok(())
    }

    /// Averaged class probabilities, in `classes` order
    pub fn predict_proba(&self, features: &[f64; FEATURE_COUNT]) -> Vec<f64> {
        let mut totals = vec![0.0; self.classes.len()];

        for tree in &self.trees {
            let weights = tree.leaf_for(features);
            let sum: f64 = weights.iter().sum();
            if sum > 0.0 {
                for (total, weight) in totals.iter_mut().zip(weights) {
                    *total += weight / sum;
                }
            }
        }

        let tree_count = self.trees.len() as f64;
        totals.iter_mut().for_each(|t| *t /= tree_count);
        totals
    }
}

impl InferenceProvider for ForestModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn predict(&self, features: &[f64; FEATURE_COUNT]) -> Result<StressLevel, InferenceError> {
        check_features(features)?;

        let proba = self.predict_proba(features);

        // First maximum wins on ties
        let mut best = 0;
        for (index, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = index;
            }
        }

        let label = *self
            .classes
            .get(best)
            .ok_or_else(|| InferenceError::Model("empty class list".to_string()))?;
        StressLevel::try_from(label).map_err(|_| InferenceError::UnknownClass(label))
    }
}

impl DecisionTree {
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }

        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {} splits on unknown feature {}", index, feature));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {} has a non-finite threshold", index));
                    }
                    for child in [*left, *right] {
                        if child <= index || child >= self.nodes.len() {
                            return Err(format!("node {} has invalid child {}", index, child));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != n_classes {
                        return Err(format!(
                            "leaf {} has {} weights for {} classes",
                            index,
                            value.len(),
                            n_classes
                        ));
                    }
                    if value.iter().any(|w| !w.is_finite() || *w < 0.0) {
                        return Err(format!("leaf {} has a negative or non-finite weight", index));
                    }
                }
            }
        }

        Ok(())
    }

    /// Walk from the root to the leaf selected by `features`
    ///
    /// Children are always at a higher index (checked in `validate`), so the
    /// walk terminates within `nodes.len()` steps.
    fn leaf_for(&self, features: &[f64; FEATURE_COUNT]) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    /// Two-tree forest keyed mostly on heart rate
    pub(crate) fn sample_model_json() -> serde_json::Value {
        json!({
            "model_id": "test-forest",
            "n_features": 3,
            "classes": [0, 1, 2],
            "trees": [
                {"nodes": [
                    {"feature": 1, "threshold": 75.0, "left": 1, "right": 2},
                    {"value": [10.0, 1.0, 0.0]},
                    {"feature": 1, "threshold": 100.0, "left": 3, "right": 4},
                    {"value": [1.0, 8.0, 1.0]},
                    {"value": [0.0, 2.0, 9.0]}
                ]},
                {"nodes": [
                    {"feature": 0, "threshold": 2.0, "left": 1, "right": 2},
                    {"feature": 2, "threshold": 37.5, "left": 3, "right": 4},
                    {"value": [0.0, 1.0, 5.0]},
                    {"value": [3.0, 4.0, 0.0]},
                    {"value": [0.0, 3.0, 3.0]}
                ]}
            ]
        })
    }

    pub(crate) fn sample_model() -> ForestModel {
        ForestModel::from_slice(&serde_json::to_vec(&sample_model_json()).unwrap()).unwrap()
    }

    #[test]
    fn test_predicts_by_averaged_probability() {
        let model = sample_model();
        assert_eq!(model.predict(&[0.5, 80.0, 36.6]).unwrap(), StressLevel::Low);
        assert_eq!(model.predict(&[0.5, 60.0, 36.6]).unwrap(), StressLevel::None);
        assert_eq!(model.predict(&[3.0, 120.0, 38.0]).unwrap(), StressLevel::High);
    }

    #[test]
    fn test_threshold_goes_left() {
        let model = sample_model();
        let proba = model.predict_proba(&[0.5, 75.0, 36.6]);
        // Tree one lands on its first leaf at exactly the threshold
        assert!(proba[0] > proba[2]);
    }

    #[test]
    fn test_rejects_non_finite_features() {
        let model = sample_model();
        assert!(matches!(
            model.predict(&[f64::NAN, 80.0, 36.6]),
            Err(InferenceError::NonFiniteFeature { index: 0, .. })
        ));
        assert!(matches!(
            model.predict(&[0.5, f64::INFINITY, 36.6]),
            Err(InferenceError::NonFiniteFeature { index: 1, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_wrong_feature_count() {
        let mut raw = sample_model_json();
        raw["n_features"] = json!(4);
        let err = ForestModel::from_slice(&serde_json::to_vec(&raw).unwrap()).unwrap_err();
        assert!(matches!(err, ModelLoadError::Invalid(_)));
    }

    #[test]
    fn test_validate_rejects_backward_child() {
        let mut raw = sample_model_json();
        raw["trees"][0]["nodes"][2]["left"] = json!(1);
        let err = ForestModel::from_slice(&serde_json::to_vec(&raw).unwrap()).unwrap_err();
        assert!(err.to_string().contains("invalid child"));
    }

    #[test]
    fn test_validate_rejects_unknown_class() {
        let mut raw = sample_model_json();
        raw["classes"] = json!([0, 1, 5]);
        assert!(ForestModel::from_slice(&serde_json::to_vec(&raw).unwrap()).is_err());
    }

    #[test]
    fn test_validate_rejects_short_leaf() {
        let mut raw = sample_model_json();
        raw["trees"][1]["nodes"][2]["value"] = json!([1.0, 2.0]);
        assert!(ForestModel::from_slice(&serde_json::to_vec(&raw).unwrap()).is_err());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            ForestModel::from_slice(b"not json"),
            Err(ModelLoadError::Parse(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_prediction_is_a_stress_level(
            eda in -10.0f64..50.0,
            heart_rate in 0.0f64..250.0,
            temperature in 20.0f64..45.0,
        ) {
            let model = sample_model();
            let level = model.predict(&[eda, heart_rate, temperature]).unwrap();
            prop_assert!(StressLevel::ALL.contains(&level));

            let proba = model.predict_proba(&[eda, heart_rate, temperature]);
            let total: f64 = proba.iter().sum();
            prop_assert!((total - 1.0).abs() < 1e-9);
        }
    }
}
