//! Assessment service: Orchestrates one risk assessment.
//!
//! This service coordinates:
//! - Numeric validation of the submitted answers
//! - Categorical encoding and feature assembly
//! - Scaling of the numeric slots
//! - Classification (label and probability fetched independently)
//! - Interpretation into verdict, guidance and risk factors

use std::sync::Arc;

use crate::adapters::artifact::Artifacts;
use crate::adapters::model::ModelAdapter;
use crate::adapters::scaler::MinMaxScalerAdapter;
use crate::domain::{
    AssessmentResult, CategoricalCodec, Feature, FeatureVector, PatientInput, RiskInterpreter,
};
use crate::ports::{ClassifierError, FeatureScaler, RiskClassifier, ScalerError};
use crate::{CardioriskError, Result};

/// Service for running risk assessments against loaded artifacts.
///
/// # Sharing
///
/// The classifier, scaler and codec are read-only after load and held behind
/// `Arc`. A service (or any clone of it) can run assessments from many
/// threads at once without locking.
pub struct AssessmentService<C = ModelAdapter, S = MinMaxScalerAdapter>
where
    C: RiskClassifier,
    S: FeatureScaler,
{
    classifier: Arc<C>,
    scaler: Arc<S>,
    codec: Arc<CategoricalCodec>,
    interpreter: RiskInterpreter,
}

impl<C, S> Clone for AssessmentService<C, S>
where
    C: RiskClassifier,
    S: FeatureScaler,
{
    fn clone(&self) -> Self {
        Self {
            classifier: Arc::clone(&self.classifier),
            scaler: Arc::clone(&self.scaler),
            codec: Arc::clone(&self.codec),
            interpreter: self.interpreter,
        }
    }
}

impl AssessmentService {
    /// Build the service from artifacts returned by
    /// [`load_artifacts`](crate::load_artifacts).
    #[must_use]
    pub fn from_artifacts(artifacts: Artifacts) -> Self {
        Self::new(artifacts.classifier, artifacts.scaler, artifacts.codec)
    }
}

impl<C, S> AssessmentService<C, S>
where
    C: RiskClassifier,
    S: FeatureScaler,
{
    /// Create a new assessment service.
    pub fn new(classifier: Arc<C>, scaler: Arc<S>, codec: Arc<CategoricalCodec>) -> Self {
        Self {
            classifier,
            scaler,
            codec,
            interpreter: RiskInterpreter::new(),
        }
    }

    /// The codec used to encode categorical answers.
    #[must_use]
    pub fn codec(&self) -> &CategoricalCodec {
        &self.codec
    }

    /// Run the full assessment pipeline for one patient.
    ///
    /// The classifier is never invoked unless every answer validated,
    /// encoded and scaled successfully.
    ///
    /// # Errors
    /// - `Validation` if a numeric answer is out of domain
    /// - `UnknownCategory` if a categorical answer is not a known label
    /// - `ScalerUnavailable` if the scaling transform cannot be applied, the
    ///   scaler covers a different slot set, or it altered a coded slot
    /// - `Inference` if the classifier output is unusable
    pub fn assess(&self, input: &PatientInput) -> Result<AssessmentResult> {
        tracing::debug!("Step 1: Validating numeric answers...");
        if let Err(e) = input.validate() {
            tracing::warn!("Assessment rejected: invalid {}", e.field().unwrap_or("input"));
            return Err(e);
        }

        tracing::debug!("Step 2: Encoding answers...");
        let raw = FeatureVector::assemble(input, &self.codec).map_err(|e| {
            tracing::warn!("Assessment rejected: unknown label for {}", e.field().unwrap_or("input"));
            e
        })?;

        tracing::debug!("Step 3: Scaling numeric features...");
        let scaled = check_scaler_set(self.scaler.scaled_features())
            .and_then(|()| self.scaler.scale(&raw))
            .and_then(|scaled| check_scaled(&raw, scaled))
            .map_err(|e| {
                tracing::error!("Scaling failed: {}", e);
                CardioriskError::from(e)
            })?;

        tracing::debug!("Step 4: Running classifier...");
        let class_label = self.classifier.predict_class(&scaled)?;
        let probability = self.classifier.predict_probability(&scaled)?;
        check_output(class_label, probability)?;

        let result = self.interpreter.interpret(input, class_label, probability);

        tracing::info!(
            "Assessment complete: verdict={:?}, tier={:?}, risk={:.1}%, flags={}",
            result.verdict,
            result.guidance_tier,
            result.risk_percentage,
            result.risk_factors.identified().len()
        );
        if result.is_divergent() {
            tracing::debug!("Verdict and guidance tier diverge for this assessment");
        }

        Ok(result)
    }
}

fn check_scaler_set(features: &[Feature]) -> std::result::Result<(), ScalerError> {
    if features == Feature::SCALED.as_slice() {
        return Ok(());
    }
    let names = |list: &[Feature]| -> Vec<String> {
        list.iter().map(|f| f.name().to_string()).collect()
    };
    Err(ScalerError::FieldMismatch {
        expected: names(&Feature::SCALED),
        actual: names(features),
    })
}

/// Coded slots must leave the scaler bit-identical.
fn check_scaled(
    raw: &FeatureVector,
    scaled: FeatureVector,
) -> std::result::Result<FeatureVector, ScalerError> {
    let changed = Feature::ALL
        .into_iter()
        .filter(|f| !f.is_numeric())
        .find(|&f| raw.get(f).to_bits() != scaled.get(f).to_bits());
    match changed {
        Some(feature) => Err(ScalerError::UnexpectedChange {
            feature: feature.name(),
        }),
        None => Ok(scaled),
    }
}

fn check_output(class_label: u8, probability: f64) -> std::result::Result<(), ClassifierError> {
    if class_label > 1 {
        return Err(ClassifierError::InvalidLabel(class_label));
    }
    if !probability.is_finite() {
        return Err(ClassifierError::NonFiniteProbability);
    }
    if !(0.0..=1.0).contains(&probability) {
        return Err(ClassifierError::ProbabilityOutOfRange(probability));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod stubs {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::domain::{Feature, FeatureVector};
    use crate::ports::{ClassifierError, FeatureScaler, RiskClassifier, ScalerError};

    /// Returns a fixed label and probability, counting calls.
    pub(crate) struct FixedClassifier {
        label: u8,
        probability: f64,
        pub(crate) calls: AtomicUsize,
    }

    impl FixedClassifier {
        pub(crate) fn new(label: u8, probability: f64) -> Self {
            Self {
                label,
                probability,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl RiskClassifier for FixedClassifier {
        fn predict_class(&self, _: &FeatureVector) -> Result<u8, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.label)
        }

        fn predict_probability(&self, _: &FeatureVector) -> Result<f64, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.probability)
        }

        fn describe(&self) -> String {
            "fixed".into()
        }
    }

    /// Probability is the (unscaled) BMI divided by 100.
    pub(crate) struct BmiClassifier;

    impl RiskClassifier for BmiClassifier {
        fn predict_class(&self, features: &FeatureVector) -> Result<u8, ClassifierError> {
            Ok(u8::from(self.predict_probability(features)? > 0.5))
        }

        fn predict_probability(&self, features: &FeatureVector) -> Result<f64, ClassifierError> {
            Ok(features.get(Feature::Bmi) / 100.0)
        }

        fn describe(&self) -> String {
            "bmi".into()
        }
    }

    pub(crate) struct PassthroughScaler;

    impl FeatureScaler for PassthroughScaler {
        fn scale(&self, features: &FeatureVector) -> Result<FeatureVector, ScalerError> {
            Ok(*features)
        }

        fn scaled_features(&self) -> &[Feature] {
            &Feature::SCALED
        }
    }

    /// Flips the age bracket slot, which no scaler may touch.
    pub(crate) struct TamperingScaler;

    impl FeatureScaler for TamperingScaler {
        fn scale(&self, features: &FeatureVector) -> Result<FeatureVector, ScalerError> {
            let age = features.get(Feature::AgeCategory);
            Ok(features.with(Feature::AgeCategory, age + 1.0))
        }

        fn scaled_features(&self) -> &[Feature] {
            &Feature::SCALED
        }
    }

    /// Claims to scale only BMI.
    pub(crate) struct PartialScaler;

    impl FeatureScaler for PartialScaler {
        fn scale(&self, features: &FeatureVector) -> Result<FeatureVector, ScalerError> {
            Ok(*features)
        }

        fn scaled_features(&self) -> &[Feature] {
            &[Feature::Bmi]
        }
    }

    pub(crate) struct FailingScaler;

    impl FeatureScaler for FailingScaler {
        fn scale(&self, _: &FeatureVector) -> Result<FeatureVector, ScalerError> {
            Err(ScalerError::NonFinite { feature: "BMI" })
        }

        fn scaled_features(&self) -> &[Feature] {
            &Feature::SCALED
        }
    }
}
