//! Domain layer: Core business types and logic.
//!
//! Pure types with no I/O: patient answers, the categorical codec, the
//! canonical feature vector, and the risk interpreter.

mod assessment;
pub mod codec;
mod features;
mod interpreter;
mod patient;

pub use assessment::{
    AssessmentResult, GuidanceTier, RiskFactors, Verdict, ASSESSMENT_FAILED, DISCLAIMER,
    NO_RISK_FACTORS,
};
pub use codec::{CategoricalCodec, CategoricalSchema, SchemaError};
pub use features::{feature_names, Feature, FeatureVector, FEATURE_COUNT};
pub use interpreter::{risk_percentage, RiskInterpreter, FLAGGED_AGE_BRACKETS};
pub use patient::PatientInput;

#[cfg(test)]
pub(crate) use patient::fixtures;
