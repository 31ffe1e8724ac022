//! Adapters layer: Concrete implementations of ports.
//!
//! - `model`: exported scikit-learn classifiers (logistic, forest, boosting)
//! - `scaler`: min-max scaling of the numeric features
//! - `artifact`: signed loading of both at startup
//! - `sanitize`: PII filtering for logs

pub mod artifact;
pub mod model;
pub mod sanitize;
pub mod scaler;
