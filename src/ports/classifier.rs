//! Classifier port: Trait for the pre-trained heart-disease model.
//!
//! This trait abstracts the concrete model family (logistic regression,
//! tree ensembles, ...) from the assessment pipeline.

use crate::domain::FeatureVector;

/// Errors that can occur while running the classifier.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifierError {
    #[error("Classifier produced a non-finite probability")]
    NonFiniteProbability,

    #[error("Probability {0} outside [0, 1]")]
    ProbabilityOutOfRange(f64),

    #[error("Classifier produced label {0}, expected 0 or 1")]
    InvalidLabel(u8),

    #[error("Feature {feature} is not finite")]
    NonFiniteFeature { feature: &'static str },
}

/// Trait for binary heart-disease classifiers.
///
/// Implementations must be pure over their loaded parameters: no interior
/// mutability, so one instance can serve concurrent assessments without
/// locking.
pub trait RiskClassifier: Send + Sync {
    /// Predict the class label (1 = at risk, 0 = not at risk) using the
    /// model's own decision rule.
    ///
    /// # Errors
    /// Returns `ClassifierError` if the input cannot be evaluated.
    fn predict_class(&self, features: &FeatureVector) -> Result<u8, ClassifierError>;

    /// Predict the probability of class 1.
    ///
    /// # Errors
    /// Returns `ClassifierError` if the input cannot be evaluated.
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, ClassifierError>;

    /// Short human-readable description of the loaded model.
    fn describe(&self) -> String;
}
