//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the assessment pipeline and the trained artifacts it consumes.

mod classifier;
mod scaler;

pub use classifier::{ClassifierError, RiskClassifier};
pub use scaler::{FeatureScaler, ScalerError};
