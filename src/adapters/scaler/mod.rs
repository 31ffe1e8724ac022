//! Min-max scaler adapter: Implementation of FeatureScaler.
//!
//! Applies `(x - min) / (max - min)` (mapped into `feature_range`, `[0, 1]`
//! by default) to exactly BMI, PhysicalHealth, MentalHealth and SleepTime,
//! using bounds fit at training time. Values outside the training bounds are
//! not clipped, matching scikit-learn's `MinMaxScaler` defaults.

use serde::{Deserialize, Serialize};

use crate::domain::{Feature, FeatureVector};
use crate::ports::{FeatureScaler, ScalerError};
use crate::CardioriskError;

fn default_feature_range() -> (f64, f64) {
    (0.0, 1.0)
}

/// Fitted scaler parameters as exported by the training pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingParameters {
    pub feature_names: Vec<String>,
    pub data_min: Vec<f64>,
    pub data_max: Vec<f64>,
    #[serde(default = "default_feature_range")]
    pub feature_range: (f64, f64),
}

#[derive(Debug, Clone, Copy)]
struct ScaledSlot {
    feature: Feature,
    min: f64,
    range: f64,
}

/// Min-max scaler over the four numeric slots.
#[derive(Debug, Clone)]
pub struct MinMaxScalerAdapter {
    slots: Vec<ScaledSlot>,
    features: Vec<Feature>,
    lower: f64,
    upper: f64,
}

impl MinMaxScalerAdapter {
    /// Validate parameters and build the adapter.
    ///
    /// # Errors
    /// Returns `ScalerError` if the parameters do not cover exactly the
    /// scaled slots in training order, or any bound is unusable.
    pub fn new(params: ScalingParameters) -> Result<Self, ScalerError> {
        let expected: Vec<String> = Feature::SCALED.iter().map(|f| f.name().to_string()).collect();
        if params.feature_names != expected {
            return Err(ScalerError::FieldMismatch {
                expected,
                actual: params.feature_names,
            });
        }

        let n = Feature::SCALED.len();
        if params.data_min.len() != n || params.data_max.len() != n {
            return Err(ScalerError::InvalidBounds {
                feature: "*".into(),
                reason: format!(
                    "expected {n} bounds, got {} minima and {} maxima",
                    params.data_min.len(),
                    params.data_max.len()
                ),
            });
        }

        let (lower, upper) = params.feature_range;
        if !lower.is_finite() || !upper.is_finite() || lower >= upper {
            return Err(ScalerError::InvalidBounds {
                feature: "feature_range".into(),
                reason: format!("({lower}, {upper}) is not an increasing finite range"),
            });
        }

        let mut slots = Vec::with_capacity(n);
        for (i, &feature) in Feature::SCALED.iter().enumerate() {
            let (min, max) = (params.data_min[i], params.data_max[i]);
            if !min.is_finite() || !max.is_finite() || min > max {
                return Err(ScalerError::InvalidBounds {
                    feature: feature.name().into(),
                    reason: format!("min {min} / max {max}"),
                });
            }
            // A constant training column scales by 1, as scikit-learn does.
            let range = if max - min == 0.0 { 1.0 } else { max - min };
            slots.push(ScaledSlot {
                feature,
                min,
                range,
            });
        }

        Ok(Self {
            slots,
            features: Feature::SCALED.to_vec(),
            lower,
            upper,
        })
    }

    /// Parse and validate a `scaler.json` document.
    ///
    /// # Errors
    /// Returns `CardioriskError::ScalerArtifactInvalid` on malformed JSON or
    /// invalid parameters.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CardioriskError> {
        let params: ScalingParameters = serde_json::from_slice(bytes).map_err(|e| {
            CardioriskError::ScalerArtifactInvalid(format!("Invalid scaler.json: {e}"))
        })?;
        Self::new(params).map_err(|e| CardioriskError::ScalerArtifactInvalid(e.to_string()))
    }
}

impl FeatureScaler for MinMaxScalerAdapter {
    fn scale(&self, features: &FeatureVector) -> Result<FeatureVector, ScalerError> {
        let mut out = *features;
        for slot in &self.slots {
            let unit = (features.get(slot.feature) - slot.min) / slot.range;
            let scaled = unit * (self.upper - self.lower) + self.lower;
            if !scaled.is_finite() {
                return Err(ScalerError::NonFinite {
                    feature: slot.feature.name(),
                });
            }
            out = out.with(slot.feature, scaled);
        }
        Ok(out)
    }

    fn scaled_features(&self) -> &[Feature] {
        &self.features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CategoricalCodec, FEATURE_COUNT};
    use crate::domain::fixtures::high_risk_patient;

    fn training_params() -> ScalingParameters {
        ScalingParameters {
            feature_names: vec![
                "BMI".into(),
                "PhysicalHealth".into(),
                "MentalHealth".into(),
                "SleepTime".into(),
            ],
            data_min: vec![12.02, 0.0, 0.0, 1.0],
            data_max: vec![94.85, 30.0, 30.0, 24.0],
            feature_range: (0.0, 1.0),
        }
    }

    #[test]
    fn test_only_numeric_slots_change() {
        let scaler = MinMaxScalerAdapter::new(training_params()).expect("Valid params");
        let raw = FeatureVector::assemble(&high_risk_patient(), &CategoricalCodec::standard())
            .expect("Should assemble");
        let scaled = scaler.scale(&raw).expect("Should scale");

        for (feature, before) in raw.iter() {
            let after = scaled.get(feature);
            if Feature::SCALED.contains(&feature) {
                assert_ne!(before.to_bits(), after.to_bits(), "{feature} should change");
            } else {
                assert_eq!(before.to_bits(), after.to_bits(), "{feature} must be untouched");
            }
        }
        // The input vector itself is not modified.
        assert_eq!(raw.get(Feature::Bmi), 32.0);
    }

    #[test]
    fn test_min_max_formula() {
        let scaler = MinMaxScalerAdapter::new(training_params()).expect("Valid params");
        let v = FeatureVector::new([0.0; FEATURE_COUNT])
            .with(Feature::Bmi, 32.0)
            .with(Feature::PhysicalHealth, 15.0)
            .with(Feature::MentalHealth, 30.0)
            .with(Feature::SleepTime, 1.0);
        let s = scaler.scale(&v).expect("Should scale");

        assert!((s.get(Feature::Bmi) - (32.0 - 12.02) / (94.85 - 12.02)).abs() < 1e-12);
        assert!((s.get(Feature::PhysicalHealth) - 0.5).abs() < 1e-12);
        assert!((s.get(Feature::MentalHealth) - 1.0).abs() < 1e-12);
        assert_eq!(s.get(Feature::SleepTime), 0.0);
    }

    #[test]
    fn test_custom_feature_range() {
        let mut params = training_params();
        params.feature_range = (-1.0, 1.0);
        let scaler = MinMaxScalerAdapter::new(params).expect("Valid params");
        let v = FeatureVector::new([0.0; FEATURE_COUNT]).with(Feature::PhysicalHealth, 15.0);
        let s = scaler.scale(&v).expect("Should scale");
        assert!(s.get(Feature::PhysicalHealth).abs() < 1e-12);
        assert!((s.get(Feature::MentalHealth) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_different_field_set() {
        let mut swapped = training_params();
        swapped.feature_names.swap(1, 2);
        assert!(matches!(
            MinMaxScalerAdapter::new(swapped),
            Err(ScalerError::FieldMismatch { .. })
        ));

        let mut extra = training_params();
        extra.feature_names.push("AgeCategory".into());
        extra.data_min.push(0.0);
        extra.data_max.push(12.0);
        assert!(MinMaxScalerAdapter::new(extra).is_err());
    }

    #[test]
    fn test_rejects_bad_bounds() {
        let mut inverted = training_params();
        inverted.data_min[0] = 100.0;
        assert!(matches!(
            MinMaxScalerAdapter::new(inverted),
            Err(ScalerError::InvalidBounds { feature, .. }) if feature == "BMI"
        ));

        let mut short = training_params();
        short.data_max.pop();
        assert!(MinMaxScalerAdapter::new(short).is_err());
    }

    #[test]
    fn test_constant_column_scales_by_one() {
        let mut params = training_params();
        params.data_min[3] = 7.0;
        params.data_max[3] = 7.0;
        let scaler = MinMaxScalerAdapter::new(params).expect("Valid params");
        let v = FeatureVector::new([0.0; FEATURE_COUNT]).with(Feature::SleepTime, 9.0);
        assert_eq!(scaler.scale(&v).expect("scale").get(Feature::SleepTime), 2.0);
    }

    #[test]
    fn test_non_finite_input_fails() {
        let scaler = MinMaxScalerAdapter::new(training_params()).expect("Valid params");
        let v = FeatureVector::new([0.0; FEATURE_COUNT]).with(Feature::Bmi, f64::NAN);
        assert_eq!(
            scaler.scale(&v).expect_err("must fail"),
            ScalerError::NonFinite { feature: "BMI" }
        );
    }

    #[test]
    fn test_from_json_reports_invalid_artifact() {
        let err = MinMaxScalerAdapter::from_json(b"{ not json").expect_err("must fail");
        assert!(matches!(err, CardioriskError::ScalerArtifactInvalid(_)));
        assert!(err.is_fatal());

        let mut params = training_params();
        params.data_min.pop();
        let json = serde_json::to_vec(&params).expect("serialize");
        let err = MinMaxScalerAdapter::from_json(&json).expect_err("must fail");
        assert!(matches!(err, CardioriskError::ScalerArtifactInvalid(_)));

        let json = serde_json::to_vec(&training_params()).expect("serialize");
        let scaler = MinMaxScalerAdapter::from_json(&json).expect("Should parse");
        assert_eq!(scaler.scaled_features(), &Feature::SCALED);
    }
}
