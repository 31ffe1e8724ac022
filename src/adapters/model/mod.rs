//! Model adapter: Implementation of RiskClassifier over exported model JSON.
//!
//! The training pipeline exports the fitted estimator as `model.json`. Three
//! estimator families are supported, each keeping its own class decision
//! rule so that `predict_class` answers exactly what the trained estimator's
//! `predict` would:
//!
//! - `logistic_regression`: p = sigmoid(w.x + b); class 1 iff p > threshold
//!   (0.5 unless the export carries a tuned `decision_threshold`)
//! - `random_forest`: p = mean of per-tree class-1 leaf probabilities;
//!   class 1 iff p > 0.5 (argmax, ties to class 0)
//! - `gradient_boosting`: raw = init + learning_rate * sum(leaf); p = sigmoid(raw);
//!   class 1 iff raw > 0
//!
//! Feature names in the export must match the canonical slot order exactly;
//! any other layout is refused at load time.

mod tree;

pub use tree::{DecisionTree, TreeNode};

use serde::{Deserialize, Serialize};

use crate::domain::{feature_names, FeatureVector, FEATURE_COUNT};
use crate::ports::{ClassifierError, RiskClassifier};
use crate::CardioriskError;

/// Estimator-specific parameters, selected by the `kind` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelParameters {
    LogisticRegression {
        coefficients: Vec<f64>,
        intercept: f64,
        #[serde(default)]
        decision_threshold: Option<f64>,
    },
    RandomForest {
        trees: Vec<DecisionTree>,
    },
    GradientBoosting {
        init: f64,
        learning_rate: f64,
        trees: Vec<DecisionTree>,
    },
}

/// Model export as written by the training pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub feature_names: Vec<String>,

    /// Categorical schema version the model was trained against
    #[serde(default)]
    pub schema_version: Option<String>,

    #[serde(flatten)]
    pub parameters: ModelParameters,
}

/// Loaded, validated classifier.
#[derive(Debug, Clone)]
pub struct ModelAdapter {
    artifact: ModelArtifact,
}

impl ModelAdapter {
    /// Validate an artifact and wrap it.
    ///
    /// # Errors
    /// Returns `CardioriskError::ModelUnavailable` if the feature layout or
    /// any parameter is unusable.
    pub fn new(artifact: ModelArtifact) -> Result<Self, CardioriskError> {
        let unavailable = |msg: String| CardioriskError::ModelUnavailable(msg);

        let canonical = feature_names();
        if artifact.feature_names.len() != FEATURE_COUNT
            || artifact
                .feature_names
                .iter()
                .zip(canonical.iter())
                .any(|(got, want)| got != want)
        {
            return Err(unavailable(format!(
                "Model feature order {:?} does not match canonical order {:?}",
                artifact.feature_names, canonical
            )));
        }

        match &artifact.parameters {
            ModelParameters::LogisticRegression {
                coefficients,
                intercept,
                decision_threshold,
            } => {
                if coefficients.len() != FEATURE_COUNT {
                    return Err(unavailable(format!(
                        "Expected {FEATURE_COUNT} coefficients, got {}",
                        coefficients.len()
                    )));
                }
                if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
                    return Err(unavailable("Non-finite logistic parameter".into()));
                }
                if let Some(t) = decision_threshold {
                    if !(*t > 0.0 && *t < 1.0) {
                        return Err(unavailable(format!("Decision threshold {t} outside (0, 1)")));
                    }
                }
            }
            ModelParameters::RandomForest { trees } => {
                Self::validate_trees(trees, (0.0, 1.0)).map_err(unavailable)?;
            }
            ModelParameters::GradientBoosting {
                init,
                learning_rate,
                trees,
            } => {
                if !init.is_finite() || !learning_rate.is_finite() || *learning_rate <= 0.0 {
                    return Err(unavailable("Invalid boosting init/learning_rate".into()));
                }
                Self::validate_trees(trees, (f64::MIN, f64::MAX)).map_err(unavailable)?;
            }
        }

        Ok(Self { artifact })
    }

    /// Parse and validate a `model.json` document.
    ///
    /// # Errors
    /// Returns `CardioriskError::ModelUnavailable` on malformed JSON or an
    /// invalid model.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CardioriskError> {
        let artifact: ModelArtifact = serde_json::from_slice(bytes)
            .map_err(|e| CardioriskError::ModelUnavailable(format!("Invalid model.json: {e}")))?;
        Self::new(artifact)
    }

    fn validate_trees(trees: &[DecisionTree], leaf_range: (f64, f64)) -> Result<(), String> {
        if trees.is_empty() {
            return Err("Tree ensemble has no trees".into());
        }
        for (i, tree) in trees.iter().enumerate() {
            tree.validate(FEATURE_COUNT, leaf_range)
                .map_err(|e| format!("tree {i}: {e}"))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn schema_version(&self) -> Option<&str> {
        self.artifact.schema_version.as_deref()
    }

    #[must_use]
    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    fn checked_input<'a>(features: &'a FeatureVector) -> Result<&'a [f64], ClassifierError> {
        if let Some((feature, _)) = features.iter().find(|(_, x)| !x.is_finite()) {
            return Err(ClassifierError::NonFiniteFeature {
                feature: feature.name(),
            });
        }
        Ok(features.as_slice())
    }

    /// Decision-function value; its sign carries the class for
    /// margin-based estimators.
    fn raw_score(&self, x: &[f64]) -> f64 {
        match &self.artifact.parameters {
            ModelParameters::LogisticRegression {
                coefficients,
                intercept,
                ..
            } => intercept + coefficients.iter().zip(x).map(|(w, v)| w * v).sum::<f64>(),
            ModelParameters::RandomForest { trees } => {
                trees.iter().map(|t| t.evaluate(x)).sum::<f64>() / trees.len() as f64
            }
            ModelParameters::GradientBoosting {
                init,
                learning_rate,
                trees,
            } => init + learning_rate * trees.iter().map(|t| t.evaluate(x)).sum::<f64>(),
        }
    }

    fn probability_from_raw(&self, raw: f64) -> f64 {
        match self.artifact.parameters {
            ModelParameters::RandomForest { .. } => raw,
            ModelParameters::LogisticRegression { .. }
            | ModelParameters::GradientBoosting { .. } => sigmoid(raw),
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl RiskClassifier for ModelAdapter {
    fn predict_class(&self, features: &FeatureVector) -> Result<u8, ClassifierError> {
        let x = Self::checked_input(features)?;
        let raw = self.raw_score(x);

        let positive = match &self.artifact.parameters {
            ModelParameters::LogisticRegression {
                decision_threshold, ..
            } => sigmoid(raw) > decision_threshold.unwrap_or(0.5),
            ModelParameters::RandomForest { .. } => raw > 0.5,
            ModelParameters::GradientBoosting { .. } => raw > 0.0,
        };
        Ok(u8::from(positive))
    }

    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, ClassifierError> {
        let x = Self::checked_input(features)?;
        let p = self.probability_from_raw(self.raw_score(x));

        if !p.is_finite() {
            return Err(ClassifierError::NonFiniteProbability);
        }
        if !(0.0..=1.0).contains(&p) {
            return Err(ClassifierError::ProbabilityOutOfRange(p));
        }
        Ok(p)
    }

    fn describe(&self) -> String {
        match &self.artifact.parameters {
            ModelParameters::LogisticRegression {
                decision_threshold, ..
            } => format!(
                "logistic_regression (threshold {})",
                decision_threshold.unwrap_or(0.5)
            ),
            ModelParameters::RandomForest { trees } => {
                format!("random_forest ({} trees)", trees.len())
            }
            ModelParameters::GradientBoosting { trees, .. } => {
                format!("gradient_boosting ({} trees)", trees.len())
            }
        }
    }
}
