//! Scaler port: Trait for training-time feature scaling.

use crate::domain::{Feature, FeatureVector};

/// Errors that can occur while scaling a feature vector.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScalerError {
    #[error("Scaling parameters cover {actual:?}, expected {expected:?}")]
    FieldMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Invalid bounds for {feature}: {reason}")]
    InvalidBounds { feature: String, reason: String },

    #[error("Scaling {feature} produced a non-finite value")]
    NonFinite { feature: &'static str },

    #[error("Scaler modified unscaled slot {feature}")]
    UnexpectedChange { feature: &'static str },
}

/// Trait for applying a previously fit scaling transform.
///
/// Implementations hold read-only parameters and return a new vector;
/// slots outside [`FeatureScaler::scaled_features`] are copied unchanged.
pub trait FeatureScaler: Send + Sync {
    /// Scale the designated slots of `features`.
    ///
    /// # Errors
    /// Returns `ScalerError` if the transform cannot be applied.
    fn scale(&self, features: &FeatureVector) -> Result<FeatureVector, ScalerError>;

    /// Slots this scaler modifies, in order.
    fn scaled_features(&self) -> &[Feature];
}
