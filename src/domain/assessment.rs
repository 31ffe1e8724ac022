//! Assessment result types.
//!
//! Represents the interpreted output of one risk assessment: the classifier's
//! own verdict, the probability-driven guidance tier, and the flagged risk
//! factors, together with the guidance text shown to nursing staff.

use serde::{Deserialize, Serialize};

/// Disclaimer attached to every rendered report.
pub const DISCLAIMER: &str = "This tool is for educational purposes and should not replace clinical judgment.";

/// Shown in place of a report when an assessment fails for any reason.
pub const ASSESSMENT_FAILED: &str = "Assessment could not be completed; verify all inputs.";

/// Shown when no risk factor applies.
pub const NO_RISK_FACTORS: &str = "No major risk factors identified";

/// Binary clinical prediction taken from the classifier's own class decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    AtRisk,
    NotAtRisk,
}

impl Verdict {
    /// Verdict for a classifier label; only label 1 means at risk.
    #[must_use]
    pub fn from_class_label(label: u8) -> Self {
        if label == 1 {
            Self::AtRisk
        } else {
            Self::NotAtRisk
        }
    }

    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::AtRisk => "At Risk of Heart Disease",
            Self::NotAtRisk => "Not At Risk of Heart Disease",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AtRisk => write!(f, "AT RISK"),
            Self::NotAtRisk => write!(f, "NOT AT RISK"),
        }
    }
}

/// Recommendation bucket derived from probability alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuidanceTier {
    Elevated,
    Low,
}

impl GuidanceTier {
    /// Probability at or above which guidance is elevated.
    pub const ELEVATED_THRESHOLD: f64 = 0.5;

    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        if probability >= Self::ELEVATED_THRESHOLD {
            Self::Elevated
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub fn headline(&self) -> &'static str {
        match self {
            Self::Elevated => "This patient shows elevated risk for heart disease.",
            Self::Low => "This patient shows low risk for heart disease.",
        }
    }

    #[must_use]
    pub fn actions(&self) -> &'static [&'static str] {
        match self {
            Self::Elevated => &[
                "Schedule cardiology consultation within 2 weeks",
                "Order ECG and lipid profile tests",
                "Provide heart health education materials",
                "Schedule follow-up appointment in 1 month",
            ],
            Self::Low => &[
                "Reinforce heart-healthy lifestyle habits",
                "Provide preventive care education",
                "Schedule annual wellness check",
            ],
        }
    }

    /// Full guidance text: headline, then one bulleted line per action.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = format!("{}\nRecommended actions:", self.headline());
        for action in self.actions() {
            out.push_str("\n- ");
            out.push_str(action);
        }
        out
    }
}

impl std::fmt::Display for GuidanceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Elevated => write!(f, "ELEVATED"),
            Self::Low => write!(f, "LOW"),
        }
    }
}

/// Flagged risk factors, always carrying a human-readable summary.
///
/// An empty list still renders: its summary is [`NO_RISK_FACTORS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFactors {
    identified: Vec<String>,
    summary: String,
}

impl RiskFactors {
    #[must_use]
    pub fn new(identified: Vec<String>) -> Self {
        let summary = if identified.is_empty() {
            NO_RISK_FACTORS.to_string()
        } else {
            format!("Identified risk factors: {}", identified.join(", "))
        };
        Self {
            identified,
            summary,
        }
    }

    #[must_use]
    pub fn identified(&self) -> &[String] {
        &self.identified
    }

    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identified.is_empty()
    }
}

/// Complete result of one assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    /// Unique identifier
    pub id: String,

    /// Classifier's own decision
    pub verdict: Verdict,

    /// Class-1 probability reported by the classifier (0.0 to 1.0)
    pub probability: f64,

    /// `probability * 100`, rounded to one decimal
    pub risk_percentage: f64,

    /// Probability-driven guidance bucket
    pub guidance_tier: GuidanceTier,

    /// Rendered guidance for the tier
    pub guidance: String,

    /// Flagged risk factors in fixed evaluation order
    pub risk_factors: RiskFactors,

    /// Timestamp of assessment
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl AssessmentResult {
    #[must_use]
    pub fn new(
        verdict: Verdict,
        probability: f64,
        risk_percentage: f64,
        guidance_tier: GuidanceTier,
        risk_factors: RiskFactors,
    ) -> Self {
        Self {
            id: uuid_v4(),
            verdict,
            probability,
            risk_percentage,
            guidance_tier,
            guidance: guidance_tier.text(),
            risk_factors,
            created_at: chrono::Utc::now(),
        }
    }

    /// Whether verdict and guidance tier point in different directions.
    #[must_use]
    pub fn is_divergent(&self) -> bool {
        matches!(
            (self.verdict, self.guidance_tier),
            (Verdict::AtRisk, GuidanceTier::Low) | (Verdict::NotAtRisk, GuidanceTier::Elevated)
        )
    }

    /// Plain-text report for the presentation layer.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "Risk Assessment Results\n\
             Clinical Prediction: {}\n\
             Model Confidence: {:.1}%\n\
             \n\
             Clinical Guidance\n\
             {}\n\
             \n\
             Key Risk Factors\n\
             {}\n\
             \n\
             Note: {}",
            self.verdict.description(),
            self.risk_percentage,
            self.guidance,
            self.risk_factors.summary(),
            DISCLAIMER,
        )
    }
}

/// Generate a UUID v4 string from a CSPRNG.
fn uuid_v4() -> String {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    let mut rng = ChaCha20Rng::from_entropy();
    let bytes: [u8; 16] = rng.gen();

    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        (bytes[6] & 0x0f) | 0x40, bytes[7],
        (bytes[8] & 0x3f) | 0x80, bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15]
    )
}
