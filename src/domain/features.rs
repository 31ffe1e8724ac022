//! Feature slots and the feature vector assembler.
//!
//! The classifier consumes a 16-slot vector whose slot order is part of its
//! training contract. [`Feature`] enumerates the slots in that order; a
//! [`FeatureVector`] is indexed by it, so a vector can only ever be laid out
//! in canonical order.

use serde::{Deserialize, Serialize};

use super::codec::CategoricalCodec;
use super::patient::PatientInput;
use crate::CardioriskError;

/// Number of slots in a feature vector.
pub const FEATURE_COUNT: usize = 16;

/// One slot of the classifier's input, declared in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Feature {
    Bmi,
    Smoking,
    AlcoholDrinking,
    Stroke,
    PhysicalHealth,
    MentalHealth,
    DiffWalking,
    Sex,
    AgeCategory,
    Diabetic,
    PhysicalActivity,
    GenHealth,
    SleepTime,
    Asthma,
    KidneyDisease,
    SkinCancer,
}

impl Feature {
    /// All slots in canonical order.
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Bmi,
        Feature::Smoking,
        Feature::AlcoholDrinking,
        Feature::Stroke,
        Feature::PhysicalHealth,
        Feature::MentalHealth,
        Feature::DiffWalking,
        Feature::Sex,
        Feature::AgeCategory,
        Feature::Diabetic,
        Feature::PhysicalActivity,
        Feature::GenHealth,
        Feature::SleepTime,
        Feature::Asthma,
        Feature::KidneyDisease,
        Feature::SkinCancer,
    ];

    /// Numeric slots that are min-max scaled, in training order.
    pub const SCALED: [Feature; 4] = [
        Feature::Bmi,
        Feature::PhysicalHealth,
        Feature::MentalHealth,
        Feature::SleepTime,
    ];

    /// Column name the model was trained with.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bmi => "BMI",
            Self::Smoking => "Smoking",
            Self::AlcoholDrinking => "AlcoholDrinking",
            Self::Stroke => "Stroke",
            Self::PhysicalHealth => "PhysicalHealth",
            Self::MentalHealth => "MentalHealth",
            Self::DiffWalking => "DiffWalking",
            Self::Sex => "Sex",
            Self::AgeCategory => "AgeCategory",
            Self::Diabetic => "Diabetic",
            Self::PhysicalActivity => "PhysicalActivity",
            Self::GenHealth => "GenHealth",
            Self::SleepTime => "SleepTime",
            Self::Asthma => "Asthma",
            Self::KidneyDisease => "KidneyDisease",
            Self::SkinCancer => "SkinCancer",
        }
    }

    /// Position of this slot in the vector.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }

    /// Whether the slot holds a raw measurement rather than a coded answer.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        Self::SCALED.contains(&self)
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Canonical column names, in slot order.
#[must_use]
pub fn feature_names() -> [&'static str; FEATURE_COUNT] {
    Feature::ALL.map(Feature::name)
}

/// Ordered, named numeric input for the classifier.
///
/// Values are fixed at construction; transforms return a new vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Wrap values already laid out in canonical order.
    #[must_use]
    pub const fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    /// Build the vector for one patient.
    ///
    /// Numeric answers pass through unmodified; every other slot is encoded
    /// by `codec`.
    ///
    /// # Errors
    /// Returns `CardioriskError::UnknownCategory` for the first label (in slot
    /// order) that the codec does not recognise.
    pub fn assemble(input: &PatientInput, codec: &CategoricalCodec) -> Result<Self, CardioriskError> {
        let code = |feature: Feature, raw: &str| codec.encode(feature, raw).map(f64::from);

        Ok(Self::new([
            input.bmi,
            code(Feature::Smoking, &input.smoking)?,
            code(Feature::AlcoholDrinking, &input.alcohol_drinking)?,
            code(Feature::Stroke, &input.stroke)?,
            f64::from(input.physical_health),
            f64::from(input.mental_health),
            code(Feature::DiffWalking, &input.diff_walking)?,
            code(Feature::Sex, &input.sex)?,
            code(Feature::AgeCategory, &input.age_category)?,
            code(Feature::Diabetic, &input.diabetic)?,
            code(Feature::PhysicalActivity, &input.physical_activity)?,
            code(Feature::GenHealth, &input.gen_health)?,
            f64::from(input.sleep_time),
            code(Feature::Asthma, &input.asthma)?,
            code(Feature::KidneyDisease, &input.kidney_disease)?,
            code(Feature::SkinCancer, &input.skin_cancer)?,
        ]))
    }

    #[must_use]
    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    /// Copy of this vector with one slot replaced.
    #[must_use]
    pub fn with(mut self, feature: Feature, value: f64) -> Self {
        self.values[feature.index()] = value;
        self
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// `(slot, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL.iter().map(|&f| (f, self.values[f.index()]))
    }
}
