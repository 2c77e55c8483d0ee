//! Per-frame scoring of gaze features.
//!
//! A scorer maps one feature vector to the probability that the subject is
//! distracted (`focused = 0`, `distracted = 1`). How the model was trained
//! is out of scope; this module only evaluates it.

use crate::core::features::{FeatureVector, FEATURE_LEN};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors produced while loading or evaluating a scorer.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid model: {0}")]
    InvalidModel(String),
    #[error("Scorer produced a non-finite score")]
    NonFinite,
    #[error("Scoring failed: {0}")]
    Failed(String),
}

/// Maps a feature vector to a distraction probability in [0,1].
pub trait Scorer {
    fn score(&self, features: &FeatureVector) -> Result<f64, ScoreError>;

    /// Human-readable name for logs.
    fn name(&self) -> &str {
        "scorer"
    }
}

impl<S: Scorer + ?Sized> Scorer for Box<S> {
    fn score(&self, features: &FeatureVector) -> Result<f64, ScoreError> {
        (**self).score(features)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Activation applied after a dense layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    Sigmoid,
    #[default]
    Linear,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => sigmoid(x),
            Activation::Linear => x,
        }
    }
}

/// Logistic function.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// One fully connected layer. `weights[j]` holds the input weights of unit `j`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// Input weights, one row per output unit
    pub weights: Vec<Vec<f64>>,
    /// One bias per output unit
    pub biases: Vec<f64>,
    /// Applied to every output unit
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    /// Number of output units.
    pub fn output_size(&self) -> usize {
        self.biases.len()
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.biases)
            .map(|(row, bias)| {
                let sum: f64 = row.iter().zip(input).map(|(w, x)| w * x).sum();
                self.activation.apply(sum + bias)
            })
            .collect()
    }
}

/// Feed-forward network loaded from a JSON weights file.
///
/// The file format is `{"input_size": 4, "layers": [{"weights": [[..]],
/// "biases": [..], "activation": "relu"}, ...]}`. The last layer must have a
/// single unit; a sigmoid there yields a probability directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseNetwork {
    /// Expected feature count
    pub input_size: usize,
    /// Layers in evaluation order
    pub layers: Vec<DenseLayer>,
}

impl DenseNetwork {
    /// Build a network, checking every layer's shape.
    pub fn new(input_size: usize, layers: Vec<DenseLayer>) -> Result<Self, ScoreError> {
        let network = Self { input_size, layers };
        network.validate()?;
        Ok(network)
    }

    /// Load and validate a network from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ScoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and shape-check a weights document.
    pub fn from_json(json: &str) -> Result<Self, ScoreError> {
        let network: DenseNetwork = serde_json::from_str(json)?;
        network.validate()?;
        Ok(network)
    }

    fn validate(&self) -> Result<(), ScoreError> {
        if self.input_size != FEATURE_LEN {
            return Err(ScoreError::InvalidModel(format!(
                "expected input size {FEATURE_LEN}, got {}",
                self.input_size
            )));
        }
        if self.layers.is_empty() {
            return Err(ScoreError::InvalidModel("model has no layers".to_string()));
        }

        let mut width = self.input_size;
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.weights.len() != layer.biases.len() || layer.biases.is_empty() {
                return Err(ScoreError::InvalidModel(format!(
                    "layer {i}: {} weight rows for {} biases",
                    layer.weights.len(),
                    layer.biases.len()
                )));
            }
            if let Some(row) = layer.weights.iter().find(|row| row.len() != width) {
                return Err(ScoreError::InvalidModel(format!(
                    "layer {i}: expected {width} inputs per unit, got {}",
                    row.len()
                )));
            }
            if layer
                .weights
                .iter()
                .flatten()
                .chain(&layer.biases)
                .any(|v| !v.is_finite())
            {
                return Err(ScoreError::InvalidModel(format!(
                    "layer {i}: non-finite parameter"
                )));
            }
            width = layer.output_size();
        }

        if width != 1 {
            return Err(ScoreError::InvalidModel(format!(
                "output layer must have 1 unit, got {width}"
            )));
        }
        Ok(())
    }
}

impl Scorer for DenseNetwork {
    fn score(&self, features: &FeatureVector) -> Result<f64, ScoreError> {
        let output = self
            .layers
            .iter()
            .fold(features.as_slice().to_vec(), |acc, layer| layer.forward(&acc));

        match output.first() {
            Some(score) if score.is_finite() => Ok(*score),
            Some(_) => Err(ScoreError::NonFinite),
            None => Err(ScoreError::Failed("network produced no output".to_string())),
        }
    }

    fn name(&self) -> &str {
        "dense-network"
    }
}

/// Adapts a closure into a [`Scorer`].
pub struct FnScorer<F> {
    name: String,
    func: F,
}

impl<F> FnScorer<F>
where
    F: Fn(&FeatureVector) -> f64,
{
    /// Wrap `func` as a scorer named `name`.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Scorer for FnScorer<F>
where
    F: Fn(&FeatureVector) -> f64,
{
    fn score(&self, features: &FeatureVector) -> Result<f64, ScoreError> {
        Ok((self.func)(features))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_sigmoid() -> DenseNetwork {
        DenseNetwork::new(
            4,
            vec![DenseLayer {
                weights: vec![vec![0.0; 4]],
                biases: vec![0.0],
                activation: Activation::Sigmoid,
            }],
        )
        .unwrap()
    }

    #[test]
    fn test_zero_network_scores_half() {
        let network = zero_sigmoid();
        let score = network.score(&FeatureVector::new([0.2, 0.9, 0.4, 0.1])).unwrap();
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_two_layer_forward_pass() {
        // Hidden relu unit reads leftX; output flips its sign through a sigmoid
        let json = r#"{
            "input_size": 4,
            "layers": [
                {"weights": [[1.0, 0.0, 0.0, 0.0], [-1.0, 0.0, 0.0, 0.0]], "biases": [0.0, 0.0], "activation": "relu"},
                {"weights": [[10.0, 0.0]], "biases": [-5.0], "activation": "sigmoid"}
            ]
        }"#;
        let network = DenseNetwork::from_json(json).unwrap();

        let low = network.score(&FeatureVector::new([0.1, 0.5, 0.5, 0.5])).unwrap();
        let high = network.score(&FeatureVector::new([0.9, 0.5, 0.5, 0.5])).unwrap();

        assert!((low - sigmoid(-4.0)).abs() < 1e-12);
        assert!((high - sigmoid(4.0)).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_wrong_input_size() {
        let err = DenseNetwork::new(
            3,
            vec![DenseLayer {
                weights: vec![vec![0.0; 3]],
                biases: vec![0.0],
                activation: Activation::Sigmoid,
            }],
        )
        .unwrap_err();
        assert!(matches!(err, ScoreError::InvalidModel(_)));
    }

    #[test]
    fn test_rejects_mismatched_rows() {
        let json = r#"{"input_size": 4, "layers": [{"weights": [[1.0, 2.0]], "biases": [0.0]}]}"#;
        assert!(matches!(
            DenseNetwork::from_json(json),
            Err(ScoreError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_rejects_multi_unit_output() {
        let json = r#"{"input_size": 4, "layers": [{"weights": [[0,0,0,0],[0,0,0,0]], "biases": [0, 0]}]}"#;
        assert!(matches!(
            DenseNetwork::from_json(json),
            Err(ScoreError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_rejects_empty_and_garbage() {
        let empty = r#"{"input_size": 4, "layers": []}"#;
        assert!(matches!(
            DenseNetwork::from_json(empty),
            Err(ScoreError::InvalidModel(_))
        ));
        assert!(matches!(
            DenseNetwork::from_json("[1, 2"),
            Err(ScoreError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, serde_json::to_string(&zero_sigmoid()).unwrap()).unwrap();

        let network = DenseNetwork::load(&path).unwrap();
        assert_eq!(network, zero_sigmoid());
        assert!(matches!(
            DenseNetwork::load(&dir.path().join("missing.json")),
            Err(ScoreError::Io(_))
        ));
    }

    #[test]
    fn test_fn_scorer() {
        let scorer = FnScorer::new("mean-x", |f: &FeatureVector| (f.left_x() + f.right_x()) / 2.0);
        assert_eq!(scorer.name(), "mean-x");
        let score = scorer.score(&FeatureVector::new([0.2, 0.0, 0.6, 0.0])).unwrap();
        assert!((score - 0.4).abs() < 1e-12);
    }
}
