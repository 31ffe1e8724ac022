//! Risk interpreter: turns a classifier decision into clinical guidance.
//!
//! The verdict comes from the classifier's class label while the guidance tier
//! comes from the probability with a fixed 0.5 cutoff. The two are computed
//! independently and may disagree near the classifier's decision boundary;
//! both are reported as-is.

use super::assessment::{AssessmentResult, GuidanceTier, RiskFactors, Verdict};
use super::patient::PatientInput;

/// BMI at or above which obesity is flagged.
pub const OBESITY_BMI: f64 = 30.0;

/// Physical-health days at or above which frequent issues are flagged.
pub const FREQUENT_PHYSICAL_ISSUE_DAYS: u8 = 15;

/// Age brackets flagged as an age risk factor.
pub const FLAGGED_AGE_BRACKETS: [&str; 6] = [
    "55-59",
    "60-64",
    "65-69",
    "70-74",
    "75-79",
    "80 or older",
];

/// Stateless interpreter; cheap to share across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskInterpreter;

impl RiskInterpreter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Interpret one classifier output for the patient it was computed from.
    #[must_use]
    pub fn interpret(
        &self,
        input: &PatientInput,
        class_label: u8,
        probability: f64,
    ) -> AssessmentResult {
        AssessmentResult::new(
            Verdict::from_class_label(class_label),
            probability,
            risk_percentage(probability),
            GuidanceTier::from_probability(probability),
            self.risk_factors(input),
        )
    }

    /// Flag every applicable risk factor, in fixed order.
    #[must_use]
    pub fn risk_factors(&self, input: &PatientInput) -> RiskFactors {
        let mut flags = Vec::new();

        if input.smoking == "Yes" {
            flags.push("Smoking".to_string());
        }
        if input.bmi >= OBESITY_BMI {
            flags.push(format!("Obesity (BMI: {})", display_decimal(input.bmi)));
        }
        if input.physical_health >= FREQUENT_PHYSICAL_ISSUE_DAYS {
            flags.push("Frequent physical health issues".to_string());
        }
        if FLAGGED_AGE_BRACKETS.contains(&input.age_category.as_str()) {
            flags.push(format!("Age ({})", input.age_category));
        }
        if input.diabetic != "No" {
            flags.push("Diabetes".to_string());
        }

        RiskFactors::new(flags)
    }
}

/// Probability as a percentage rounded to one decimal.
///
/// Rounds the exact binary value of `probability * 100` half to even, so
/// `0.0125` gives `1.2` and `0.0215` (stored just below `2.15`) gives `2.1`.
#[must_use]
pub fn risk_percentage(probability: f64) -> f64 {
    let percent = probability * 100.0;
    let tenths = percent * 10.0;
    // Exact error of the multiplication above; decides ties the product
    // rounded onto.
    let residual = percent.mul_add(10.0, -tenths);
    let rounded = if tenths.fract().abs() == 0.5 && residual != 0.0 {
        if residual > 0.0 {
            tenths.ceil()
        } else {
            tenths.floor()
        }
    } else {
        tenths.round_ties_even()
    };
    rounded / 10.0
}

/// Decimal rendering that always keeps at least one fractional digit
/// (`32.0`, `31.5`, `27.35`).
fn display_decimal(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}
