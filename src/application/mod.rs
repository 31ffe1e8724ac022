//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! single and batch risk assessment.

mod assessment;
mod batch;

pub use assessment::AssessmentService;
pub use batch::{assess_batch, assess_records};
