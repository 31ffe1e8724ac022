//! Categorical codec: maps form labels to the integer codes the classifier
//! was trained on.
//!
//! Every categorical answer encodes as its zero-based position in an ordered
//! label list. The ordinal lists (age bracket, diabetic status, general health)
//! are part of a versioned [`CategoricalSchema`]; a codec only accepts a schema
//! whose lists match the registered training-time ordering for its version.
//! Binary answers use fixed two-label lists, so `No`/`Female` encode as 0 and
//! `Yes`/`Male` as 1.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::features::Feature;
use crate::CardioriskError;

/// Schema version of the label orderings used to train the shipped model.
pub const SCHEMA_VERSION: &str = "brfss-2020.v1";

/// Age brackets, youngest first.
pub const AGE_CATEGORIES: [&str; 13] = [
    "18-24",
    "25-29",
    "30-34",
    "35-39",
    "40-44",
    "45-49",
    "50-54",
    "55-59",
    "60-64",
    "65-69",
    "70-74",
    "75-79",
    "80 or older",
];

/// Diabetic status, in training order (not clinical severity order).
pub const DIABETIC_OPTIONS: [&str; 4] = [
    "No",
    "Yes",
    "No, borderline diabetes",
    "Yes (during pregnancy)",
];

/// General health rating, worst first.
pub const GEN_HEALTH_OPTIONS: [&str; 5] = ["Poor", "Fair", "Good", "Very good", "Excellent"];

/// Labels for yes/no answers.
pub const YES_NO: [&str; 2] = ["No", "Yes"];

/// Labels for sex.
pub const SEX_OPTIONS: [&str; 2] = ["Female", "Male"];

/// Errors raised while constructing a codec from a schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("Unsupported schema version: {0:?}")]
    UnsupportedVersion(String),

    #[error("{field} expects {expected} labels, got {actual}")]
    WrongLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{field} lists {label:?} more than once")]
    DuplicateLabel { field: &'static str, label: String },

    #[error("{field} labels do not match the training order of schema {version}")]
    OrderMismatch { field: &'static str, version: String },
}

/// Versioned label orderings for the ordinal categorical fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalSchema {
    pub version: String,
    pub age_categories: Vec<String>,
    pub diabetic_options: Vec<String>,
    pub gen_health_options: Vec<String>,
}

impl CategoricalSchema {
    /// The schema the shipped model was trained with.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            age_categories: owned(&AGE_CATEGORIES),
            diabetic_options: owned(&DIABETIC_OPTIONS),
            gen_health_options: owned(&GEN_HEALTH_OPTIONS),
        }
    }

    /// Registered schema for a version, if one is known.
    #[must_use]
    pub fn registered(version: &str) -> Option<Self> {
        (version == SCHEMA_VERSION).then(Self::standard)
    }

    /// Short SHA-256 fingerprint over the version and every label, in order.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.version.as_bytes());
        for list in [
            &self.age_categories,
            &self.diabetic_options,
            &self.gen_health_options,
        ] {
            hasher.update([0x1e]);
            for label in list {
                hasher.update(label.as_bytes());
                hasher.update([0x1f]);
            }
        }
        let digest = hasher.finalize();
        digest[..8].iter().map(|b| format!("{b:02x}")).collect()
    }

    fn lists(&self) -> [(&'static str, &Vec<String>); 3] {
        [
            (Feature::AgeCategory.name(), &self.age_categories),
            (Feature::Diabetic.name(), &self.diabetic_options),
            (Feature::GenHealth.name(), &self.gen_health_options),
        ]
    }
}

impl Default for CategoricalSchema {
    fn default() -> Self {
        Self::standard()
    }
}

fn owned(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|s| (*s).to_string()).collect()
}

/// Encoder from form labels to classifier codes.
#[derive(Debug, Clone)]
pub struct CategoricalCodec {
    schema: CategoricalSchema,
    yes_no: Vec<String>,
    sex: Vec<String>,
}

impl CategoricalCodec {
    /// Build a codec, checking the schema against its registered version.
    ///
    /// # Errors
    /// Returns `SchemaError` if the version is unknown or any list differs in
    /// length, uniqueness or order from the registered training schema.
    pub fn new(schema: CategoricalSchema) -> Result<Self, SchemaError> {
        let expected = CategoricalSchema::registered(&schema.version)
            .ok_or_else(|| SchemaError::UnsupportedVersion(schema.version.clone()))?;

        for ((field, actual), (_, wanted)) in schema.lists().into_iter().zip(expected.lists()) {
            if actual.len() != wanted.len() {
                return Err(SchemaError::WrongLength {
                    field,
                    expected: wanted.len(),
                    actual: actual.len(),
                });
            }
            for (i, label) in actual.iter().enumerate() {
                if actual[..i].contains(label) {
                    return Err(SchemaError::DuplicateLabel {
                        field,
                        label: label.clone(),
                    });
                }
            }
            if actual != wanted {
                return Err(SchemaError::OrderMismatch {
                    field,
                    version: schema.version.clone(),
                });
            }
        }

        Ok(Self::from_checked(schema))
    }

    /// Codec over the standard schema.
    #[must_use]
    pub fn standard() -> Self {
        Self::from_checked(CategoricalSchema::standard())
    }

    fn from_checked(schema: CategoricalSchema) -> Self {
        Self {
            schema,
            yes_no: owned(&YES_NO),
            sex: owned(&SEX_OPTIONS),
        }
    }

    #[must_use]
    pub fn schema(&self) -> &CategoricalSchema {
        &self.schema
    }

    /// Ordered label list for a categorical slot; `None` for numeric slots.
    #[must_use]
    pub fn labels(&self, feature: Feature) -> Option<&[String]> {
        match feature {
            Feature::AgeCategory => Some(&self.schema.age_categories),
            Feature::Diabetic => Some(&self.schema.diabetic_options),
            Feature::GenHealth => Some(&self.schema.gen_health_options),
            Feature::Sex => Some(&self.sex),
            Feature::Smoking
            | Feature::AlcoholDrinking
            | Feature::Stroke
            | Feature::DiffWalking
            | Feature::PhysicalActivity
            | Feature::Asthma
            | Feature::KidneyDisease
            | Feature::SkinCancer => Some(&self.yes_no),
            Feature::Bmi
            | Feature::PhysicalHealth
            | Feature::MentalHealth
            | Feature::SleepTime => None,
        }
    }

    /// Encode a label as its zero-based position in the field's label list.
    ///
    /// Matching is exact: no trimming, no case folding.
    ///
    /// # Errors
    /// Returns `CardioriskError::UnknownCategory` if the label is not listed,
    /// or `CardioriskError::Validation` if the slot is numeric.
    pub fn encode(&self, feature: Feature, raw: &str) -> Result<u8, CardioriskError> {
        let labels = self
            .labels(feature)
            .ok_or_else(|| CardioriskError::Validation {
                field: feature.name(),
                reason: "numeric field has no categorical encoding".to_string(),
            })?;

        labels
            .iter()
            .position(|label| label == raw)
            .and_then(|i| u8::try_from(i).ok())
            .ok_or_else(|| CardioriskError::UnknownCategory {
                field: feature.name(),
                value: raw.to_string(),
            })
    }
}

impl Default for CategoricalCodec {
    fn default() -> Self {
        Self::standard()
    }
}
