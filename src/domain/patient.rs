//! Patient input for heart-disease risk assessment.
//!
//! Answers arrive exactly as the assessment form collects them: categorical
//! fields as their human-readable labels, counts and measurements as numbers.
//! Categorical labels are checked by the codec; numeric ranges are checked here.

use serde::{Deserialize, Serialize};

use crate::CardioriskError;

/// Inclusive clinical range accepted for BMI.
pub const BMI_RANGE: (f64, f64) = (10.0, 50.0);

/// Inclusive range for physical/mental health days in the past 30 days.
pub const HEALTH_DAYS_RANGE: (u8, u8) = (0, 30);

/// Inclusive range for average daily sleep hours.
pub const SLEEP_HOURS_RANGE: (u8, u8) = (1, 12);

#[derive(Clone, Copy)]
enum AnswerKind {
    Label,
    Measure,
    Count,
}

/// Wire name and expected JSON type of every answer, in form order.
const ANSWERS: [(&str, AnswerKind); 16] = [
    ("age_category", AnswerKind::Label),
    ("sex", AnswerKind::Label),
    ("bmi", AnswerKind::Measure),
    ("smoking", AnswerKind::Label),
    ("alcohol_drinking", AnswerKind::Label),
    ("stroke", AnswerKind::Label),
    ("diff_walking", AnswerKind::Label),
    ("asthma", AnswerKind::Label),
    ("kidney_disease", AnswerKind::Label),
    ("skin_cancer", AnswerKind::Label),
    ("physical_activity", AnswerKind::Label),
    ("diabetic", AnswerKind::Label),
    ("gen_health", AnswerKind::Label),
    ("physical_health", AnswerKind::Count),
    ("mental_health", AnswerKind::Count),
    ("sleep_time", AnswerKind::Count),
];

/// Raw answers for a single patient.
///
/// Immutable once submitted; the pipeline only ever borrows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientInput {
    /// Age bracket label, e.g. `"60-64"` or `"80 or older"`
    pub age_category: String,

    /// `"Female"` or `"Male"`
    pub sex: String,

    /// Body mass index
    pub bmi: f64,

    /// Current smoker (`"Yes"` / `"No"`)
    pub smoking: String,

    /// Heavy alcohol consumption (>14 drinks/week for men, >7 for women)
    pub alcohol_drinking: String,

    /// History of stroke
    pub stroke: String,

    /// Difficulty walking or climbing stairs
    pub diff_walking: String,

    /// Asthma diagnosis
    pub asthma: String,

    /// Kidney disease
    pub kidney_disease: String,

    /// Skin cancer
    pub skin_cancer: String,

    /// Regular physical activity (>150 min moderate or >75 min vigorous/week)
    pub physical_activity: String,

    /// Diabetes status label, e.g. `"No"` or `"No, borderline diabetes"`
    pub diabetic: String,

    /// General health rating label, `"Poor"` .. `"Excellent"`
    pub gen_health: String,

    /// Days with physical health problems in the past 30 days
    pub physical_health: u8,

    /// Days with mental health problems in the past 30 days
    pub mental_health: u8,

    /// Average daily sleep in hours
    pub sleep_time: u8,
}

impl PatientInput {
    /// Decode one submitted record.
    ///
    /// Fails on this record alone, naming the first answer that is missing or
    /// has the wrong JSON type (a count must fit 0..=255).
    ///
    /// # Errors
    /// Returns `CardioriskError::Validation` naming the offending answer, or
    /// `field = "patient"` if the record is not a JSON object.
    pub fn from_value(value: serde_json::Value) -> Result<Self, CardioriskError> {
        let Some(answers) = value.as_object() else {
            return Err(CardioriskError::Validation {
                field: "patient",
                reason: "record is not a JSON object".into(),
            });
        };

        for (field, kind) in ANSWERS {
            let Some(answer) = answers.get(field) else {
                return Err(CardioriskError::Validation {
                    field,
                    reason: "missing answer".into(),
                });
            };
            let decoded = match kind {
                AnswerKind::Label => String::deserialize(answer).map(drop),
                AnswerKind::Measure => f64::deserialize(answer).map(drop),
                AnswerKind::Count => u8::deserialize(answer).map(drop),
            };
            if let Err(e) = decoded {
                return Err(CardioriskError::Validation {
                    field,
                    reason: e.to_string(),
                });
            }
        }

        Ok(serde_json::from_value(value)?)
    }

    /// Check every numeric answer against its declared domain.
    ///
    /// # Errors
    /// Returns `CardioriskError::Validation` naming the first field out of range.
    pub fn validate(&self) -> Result<(), CardioriskError> {
        match self.violations().into_iter().next() {
            None => Ok(()),
            Some((field, reason)) => Err(CardioriskError::Validation { field, reason }),
        }
    }

    /// All numeric-range violations, in field order.
    #[must_use]
    pub fn violations(&self) -> Vec<(&'static str, String)> {
        let mut errors = Vec::new();

        if !self.bmi.is_finite() || !(BMI_RANGE.0..=BMI_RANGE.1).contains(&self.bmi) {
            errors.push((
                "bmi",
                format!(
                    "BMI {} out of range [{}, {}]",
                    self.bmi, BMI_RANGE.0, BMI_RANGE.1
                ),
            ));
        }
        for (field, days) in [
            ("physical_health", self.physical_health),
            ("mental_health", self.mental_health),
        ] {
            if !(HEALTH_DAYS_RANGE.0..=HEALTH_DAYS_RANGE.1).contains(&days) {
                errors.push((
                    field,
                    format!(
                        "{days} days out of range [{}, {}]",
                        HEALTH_DAYS_RANGE.0, HEALTH_DAYS_RANGE.1
                    ),
                ));
            }
        }
        if !(SLEEP_HOURS_RANGE.0..=SLEEP_HOURS_RANGE.1).contains(&self.sleep_time) {
            errors.push((
                "sleep_time",
                format!(
                    "{} hours out of range [{}, {}]",
                    self.sleep_time, SLEEP_HOURS_RANGE.0, SLEEP_HOURS_RANGE.1
                ),
            ));
        }

        errors
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::PatientInput;

    /// A patient with no flagged risk factors.
    pub(crate) fn healthy_patient() -> PatientInput {
        PatientInput {
            age_category: "30-34".into(),
            sex: "Female".into(),
            bmi: 22.5,
            smoking: "No".into(),
            alcohol_drinking: "No".into(),
            stroke: "No".into(),
            diff_walking: "No".into(),
            asthma: "No".into(),
            kidney_disease: "No".into(),
            skin_cancer: "No".into(),
            physical_activity: "Yes".into(),
            diabetic: "No".into(),
            gen_health: "Very good".into(),
            physical_health: 0,
            mental_health: 2,
            sleep_time: 7,
        }
    }

    /// A patient that trips every risk-factor flag.
    pub(crate) fn high_risk_patient() -> PatientInput {
        PatientInput {
            age_category: "60-64".into(),
            sex: "Male".into(),
            bmi: 32.0,
            smoking: "Yes".into(),
            alcohol_drinking: "No".into(),
            stroke: "Yes".into(),
            diff_walking: "Yes".into(),
            asthma: "No".into(),
            kidney_disease: "No".into(),
            skin_cancer: "No".into(),
            physical_activity: "No".into(),
            diabetic: "Yes".into(),
            gen_health: "Fair".into(),
            physical_health: 20,
            mental_health: 5,
            sleep_time: 6,
        }
    }
}
