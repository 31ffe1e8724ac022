//! # Cardiorisk
//!
//! Heart-disease risk assessment from sixteen clinical and lifestyle answers.
//!
//! This crate provides:
//! - Encoding of form answers into the classifier's 16-slot feature vector
//! - Min-max scaling consistent with training-time preprocessing
//! - Inference against a pre-trained, signed model artifact
//! - Translation of the model output into guidance and flagged risk factors
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (PatientInput, FeatureVector, AssessmentResult) and
//!   the codec and interpreter logic
//! - `ports`: Trait definitions for the classifier and scaler
//! - `adapters`: Concrete implementations (JSON model/scaler artifacts,
//!   signed-manifest loading, log sanitization)
//! - `application`: The assessment pipeline and concurrent batch runner
//! - `config`: Environment-driven configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use adapters::artifact::{load_artifacts, Artifacts};
pub use application::AssessmentService;
pub use domain::{AssessmentResult, GuidanceTier, PatientInput, Verdict};

use domain::{SchemaError, ASSESSMENT_FAILED};
use ports::{ClassifierError, ScalerError};

/// Result type for Cardiorisk operations
pub type Result<T> = std::result::Result<T, CardioriskError>;

/// Main error type for Cardiorisk
#[derive(Debug, thiserror::Error)]
pub enum CardioriskError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Scaler artifact invalid: {0}")]
    ScalerArtifactInvalid(String),

    #[error("Scaler unavailable: {0}")]
    ScalerUnavailable(String),

    #[error("Unknown category for {field}: {value:?}")]
    UnknownCategory { field: &'static str, value: String },

    #[error("Invalid patient data for {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("Inference failed: {0}")]
    Inference(#[from] ClassifierError),

    #[error("Categorical schema rejected: {0}")]
    Schema(#[from] SchemaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<ScalerError> for CardioriskError {
    fn from(e: ScalerError) -> Self {
        Self::ScalerUnavailable(e.to_string())
    }
}

impl CardioriskError {
    /// Whether the error must stop the process rather than a single request.
    ///
    /// An unloadable `scaler.json` is `ScalerArtifactInvalid` and fatal; a
    /// scaling failure on one request is `ScalerUnavailable` and is not.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ModelUnavailable(_) | Self::ScalerArtifactInvalid(_) | Self::Schema(_)
        )
    }

    /// The input field that caused a request-level failure, if any.
    #[must_use]
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::UnknownCategory { field, .. } | Self::Validation { field, .. } => Some(*field),
            _ => None,
        }
    }

    /// Message shown to staff for any failed assessment.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        ASSESSMENT_FAILED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_is_reported_for_request_errors() {
        let e = CardioriskError::UnknownCategory {
            field: "Diabetic",
            value: "Sometimes".into(),
        };
        assert_eq!(e.field(), Some("Diabetic"));
        assert!(!e.is_fatal());
        assert_eq!(
            e.user_message(),
            "Assessment could not be completed; verify all inputs."
        );
        assert!(e.to_string().contains("Sometimes"));
    }

    #[test]
    fn test_model_unavailable_is_fatal() {
        assert!(CardioriskError::ModelUnavailable("missing".into()).is_fatal());
        assert!(!CardioriskError::ScalerUnavailable("bad bounds".into()).is_fatal());
    }

    #[test]
    fn test_invalid_scaler_artifact_is_fatal() {
        assert!(CardioriskError::ScalerArtifactInvalid("bad json".into()).is_fatal());
        assert_eq!(
            CardioriskError::ScalerArtifactInvalid("bad json".into()).field(),
            None
        );
    }

    #[test]
    fn test_scaler_error_maps_to_scaler_unavailable() {
        let e: CardioriskError = ScalerError::NonFinite { feature: "BMI" }.into();
        assert!(matches!(e, CardioriskError::ScalerUnavailable(msg) if msg.contains("BMI")));
    }
}
