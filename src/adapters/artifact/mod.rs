//! Artifact loading: startup-time loading of the trained model and scaler.
//!
//! The artifact directory holds:
//! - `model.json`: the exported classifier (see [`crate::adapters::model`])
//! - `scaler.json`: the fitted min-max scaler (see [`crate::adapters::scaler`])
//! - `manifest.json`: SHA-256 hashes binding both files
//! - `model.sig`: Ed25519 signature over the exact manifest bytes
//!
//! # Security
//!
//! - Every artifact file must be bound by the signed manifest
//! - In release builds a valid signature is always required
//! - In debug builds unsigned artifacts load only when explicitly allowed
//!
//! Any failure here is fatal: the process must not serve assessments without
//! a verified model and scaler.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::adapters::model::ModelAdapter;
use crate::adapters::scaler::MinMaxScalerAdapter;
use crate::config::ArtifactConfig;
use crate::domain::{CategoricalCodec, CategoricalSchema};
use crate::ports::RiskClassifier;
use crate::CardioriskError;

pub const MODEL_FILE: &str = "model.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "model.sig";

const MANIFEST_VERSION: u32 = 1;

/// Clock skew tolerated for manifest timestamps.
const FUTURE_SKEW_SECS: i64 = 300;

/// Signed list of artifact files and their SHA-256 digests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub version: u32,
    #[serde(default)]
    pub serial: Option<u64>,
    #[serde(default)]
    pub created_at: Option<i64>,
    pub files: BTreeMap<String, String>,
}

/// The read-only artifacts shared by every assessment for the process lifetime.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub classifier: Arc<ModelAdapter>,
    pub scaler: Arc<MinMaxScalerAdapter>,
    pub codec: Arc<CategoricalCodec>,
    /// Verified manifest; `None` when unsigned artifacts were allowed
    pub manifest: Option<ArtifactManifest>,
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes).iter().map(|b| format!("{b:02x}")).collect()
}

// Constant-time compare for ASCII strings (used for SHA-256 hex digests).
fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn model_unavailable(msg: impl Into<String>) -> CardioriskError {
    CardioriskError::ModelUnavailable(msg.into())
}

/// Load and verify both artifacts.
///
/// # Errors
/// Returns `CardioriskError::ModelUnavailable` if the directory, manifest,
/// signature or model cannot be verified or parsed, and
/// `CardioriskError::ScalerArtifactInvalid` if the scaler cannot be read or
/// parsed. Both are fatal.
pub fn load_artifacts(config: &ArtifactConfig) -> Result<Artifacts, CardioriskError> {
    let dir = config.model_dir.as_path();
    if !dir.is_dir() {
        return Err(model_unavailable(format!(
            "Artifact directory {dir:?} not found"
        )));
    }

    let manifest = verify_manifest(dir, config)?;

    let model_bytes = fs::read(dir.join(MODEL_FILE))
        .map_err(|e| model_unavailable(format!("Failed to read {MODEL_FILE}: {e}")))?;
    let classifier = ModelAdapter::from_json(&model_bytes)?;

    let scaler_bytes = fs::read(dir.join(SCALER_FILE)).map_err(|e| {
        CardioriskError::ScalerArtifactInvalid(format!("Failed to read {SCALER_FILE}: {e}"))
    })?;
    let scaler = MinMaxScalerAdapter::from_json(&scaler_bytes)?;

    let schema = match classifier.schema_version() {
        Some(version) => CategoricalSchema::registered(version).ok_or_else(|| {
            model_unavailable(format!(
                "Model was trained against unknown categorical schema {version:?}"
            ))
        })?,
        None => {
            tracing::warn!("Model does not declare a categorical schema version; assuming the standard schema");
            CategoricalSchema::standard()
        }
    };
    let codec = CategoricalCodec::new(schema)?;

    tracing::info!(
        "Loaded artifacts from {:?}: model={}, features={}, schema={} ({}), signed={}",
        dir,
        classifier.describe(),
        classifier.artifact().feature_names.len(),
        codec.schema().version,
        codec.schema().fingerprint(),
        manifest.is_some()
    );

    Ok(Artifacts {
        classifier: Arc::new(classifier),
        scaler: Arc::new(scaler),
        codec: Arc::new(codec),
        manifest,
    })
}

/// Verify `manifest.json` + `model.sig` and the hashes they bind.
fn verify_manifest(
    dir: &Path,
    config: &ArtifactConfig,
) -> Result<Option<ArtifactManifest>, CardioriskError> {
    let sig_path = dir.join(SIGNATURE_FILE);
    let manifest_path = dir.join(MANIFEST_FILE);

    if !sig_path.exists() || !manifest_path.exists() {
        if cfg!(debug_assertions) && config.allow_unsigned {
            tracing::warn!(
                "Loading UNSIGNED artifacts from {:?}. This is only allowed in debug builds.",
                dir
            );
            return Ok(None);
        }
        tracing::error!("Artifact signature not found at {:?}", sig_path);
        return Err(model_unavailable(
            "Signed manifest required (manifest.json + model.sig)",
        ));
    }

    let sig_bytes = fs::read(&sig_path)
        .map_err(|e| model_unavailable(format!("Failed to read signature: {e}")))?;
    let sig_array: [u8; 64] = sig_bytes
        .as_slice()
        .try_into()
        .map_err(|_| model_unavailable("Invalid signature length (expected 64 bytes)"))?;
    let signature = Signature::from_bytes(&sig_array);

    let manifest_content = fs::read(&manifest_path)
        .map_err(|e| model_unavailable(format!("Failed to read manifest: {e}")))?;

    let public_key = verifying_key(config)?;
    public_key
        .verify(&manifest_content, &signature)
        .map_err(|_| model_unavailable("Invalid artifact signature"))?;

    let manifest: ArtifactManifest = serde_json::from_slice(&manifest_content)
        .map_err(|e| model_unavailable(format!("Invalid manifest.json format: {e}")))?;
    if manifest.version != MANIFEST_VERSION {
        return Err(model_unavailable(format!(
            "Unsupported manifest version: {}",
            manifest.version
        )));
    }

    if let Some(created_at) = manifest.created_at {
        let now = unix_now();
        if created_at > now + FUTURE_SKEW_SECS {
            return Err(model_unavailable("Manifest created_at is in the future"));
        }
        if let Some(max_age) = config.max_age_secs {
            if now.saturating_sub(created_at) > max_age {
                return Err(model_unavailable("Manifest is older than allowed max age"));
            }
        }
    }

    for required in [MODEL_FILE, SCALER_FILE] {
        if !manifest.files.contains_key(required) {
            return Err(model_unavailable(format!(
                "manifest.json must bind {required}"
            )));
        }
    }

    for (rel, expected_hex) in &manifest.files {
        let path = dir.join(rel);
        let bytes = fs::read(&path).map_err(|e| {
            model_unavailable(format!(
                "Manifest references missing/unreadable file {path:?}: {e}"
            ))
        })?;
        if !constant_time_eq_str(&sha256_hex(&bytes), expected_hex) {
            return Err(model_unavailable(format!("File hash mismatch for {rel}")));
        }
    }

    tracing::info!("Artifact signature and hashes verified successfully");
    Ok(Some(manifest))
}

fn verifying_key(config: &ArtifactConfig) -> Result<VerifyingKey, CardioriskError> {
    let b64 = config
        .signing_pubkey_b64
        .as_deref()
        .ok_or_else(|| model_unavailable("No artifact verifying key configured"))?;
    verifying_key_from_b64(b64)
}

/// Decode a base64 Ed25519 verifying key.
///
/// # Errors
/// Returns `CardioriskError::ModelUnavailable` if the key is malformed.
pub fn verifying_key_from_b64(b64: &str) -> Result<VerifyingKey, CardioriskError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|_| model_unavailable("Invalid public key base64"))?;
    let pubkey: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| model_unavailable("Invalid public key length (expected 32 bytes)"))?;
    VerifyingKey::from_bytes(&pubkey).map_err(|_| model_unavailable("Invalid verifying key"))
}

/// Write `manifest.json` and `model.sig` binding the artifacts in `dir`.
///
/// # Errors
/// Returns an error if an artifact is missing or a file cannot be written.
pub fn sign_artifacts(
    dir: &Path,
    signing_key: &SigningKey,
    serial: Option<u64>,
) -> Result<ArtifactManifest, CardioriskError> {
    let mut files = BTreeMap::new();
    for rel in [MODEL_FILE, SCALER_FILE] {
        let bytes = fs::read(dir.join(rel))?;
        files.insert(rel.to_string(), sha256_hex(&bytes));
    }

    let created_at = unix_now();
    let manifest = ArtifactManifest {
        version: MANIFEST_VERSION,
        serial: Some(serial.unwrap_or(created_at.max(1) as u64)),
        created_at: Some(created_at),
        files,
    };
    let manifest_bytes = serde_json::to_vec_pretty(&manifest)?;
    fs::write(dir.join(MANIFEST_FILE), &manifest_bytes)?;

    let signature: Signature = signing_key.sign(&manifest_bytes);
    fs::write(dir.join(SIGNATURE_FILE), signature.to_bytes())?;

    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::scaler::ScalingParameters;
    use crate::domain::{feature_names, FEATURE_COUNT};
    use rand::RngCore;
    use tempfile::tempdir;

    fn write_model(dir: &Path, schema_version: Option<&str>) {
        let mut json = serde_json::json!({
            "kind": "logistic_regression",
            "feature_names": feature_names(),
            "coefficients": vec![0.05; FEATURE_COUNT],
            "intercept": -2.5
        });
        if let Some(v) = schema_version {
            json["schema_version"] = serde_json::json!(v);
        }
        fs::write(dir.join(MODEL_FILE), json.to_string()).expect("write model");
    }

    fn write_scaler(dir: &Path) {
        let params = ScalingParameters {
            feature_names: vec![
                "BMI".into(),
                "PhysicalHealth".into(),
                "MentalHealth".into(),
                "SleepTime".into(),
            ],
            data_min: vec![12.02, 0.0, 0.0, 1.0],
            data_max: vec![94.85, 30.0, 30.0, 24.0],
            feature_range: (0.0, 1.0),
        };
        fs::write(
            dir.join(SCALER_FILE),
            serde_json::to_vec(&params).expect("serialize scaler"),
        )
        .expect("write scaler");
    }

    fn write_artifacts(dir: &Path) {
        write_model(dir, Some("brfss-2020.v1"));
        write_scaler(dir);
    }

    fn signing_key_pair() -> (SigningKey, String) {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        let key = SigningKey::from_bytes(&seed);
        let pubkey_b64 =
            base64::engine::general_purpose::STANDARD.encode(key.verifying_key().to_bytes());
        (key, pubkey_b64)
    }

    #[test]
    fn test_missing_directory_is_model_unavailable() {
        let config = ArtifactConfig::new("/nonexistent/cardiorisk/models").allow_unsigned(true);
        let err = load_artifacts(&config).expect_err("must fail");
        assert!(matches!(err, CardioriskError::ModelUnavailable(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_unsigned_artifacts_refused_by_default() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());

        let err = load_artifacts(&ArtifactConfig::new(temp.path())).expect_err("must fail");
        assert!(err.to_string().contains("Signed manifest required"));
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_unsigned_artifacts_load_when_allowed() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());

        let config = ArtifactConfig::new(temp.path()).allow_unsigned(true);
        let artifacts = load_artifacts(&config).expect("Should load");
        assert!(artifacts.manifest.is_none());
        assert_eq!(artifacts.codec.schema().version, "brfss-2020.v1");
    }

    #[test]
    fn test_signed_artifacts_load() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());
        let (key, pubkey_b64) = signing_key_pair();
        sign_artifacts(temp.path(), &key, Some(7)).expect("sign");

        let config = ArtifactConfig::new(temp.path()).with_signing_pubkey(pubkey_b64);
        let artifacts = load_artifacts(&config).expect("Should load signed artifacts");
        let manifest = artifacts.manifest.expect("manifest");
        assert_eq!(manifest.serial, Some(7));
        assert!(manifest.files.contains_key(MODEL_FILE));
        assert!(manifest.files.contains_key(SCALER_FILE));
    }

    #[test]
    fn test_tampered_scaler_fails_hash_check() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());
        let (key, pubkey_b64) = signing_key_pair();
        sign_artifacts(temp.path(), &key, None).expect("sign");

        let mut scaler = fs::read(temp.path().join(SCALER_FILE)).expect("read scaler");
        scaler.push(b' ');
        fs::write(temp.path().join(SCALER_FILE), scaler).expect("rewrite scaler");

        let config = ArtifactConfig::new(temp.path()).with_signing_pubkey(pubkey_b64);
        let err = load_artifacts(&config).expect_err("must fail");
        assert!(err.to_string().contains("hash mismatch"));
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());
        let (key, _) = signing_key_pair();
        let (_, other_pubkey) = signing_key_pair();
        sign_artifacts(temp.path(), &key, None).expect("sign");

        let config = ArtifactConfig::new(temp.path()).with_signing_pubkey(other_pubkey);
        let err = load_artifacts(&config).expect_err("must fail");
        assert!(err.to_string().contains("Invalid artifact signature"));
    }

    #[test]
    fn test_manifest_must_bind_scaler() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());
        let (key, pubkey_b64) = signing_key_pair();

        let mut files = BTreeMap::new();
        let model = fs::read(temp.path().join(MODEL_FILE)).expect("read model");
        files.insert(MODEL_FILE.to_string(), sha256_hex(&model));
        let manifest = ArtifactManifest {
            version: 1,
            serial: Some(1),
            created_at: Some(unix_now()),
            files,
        };
        let bytes = serde_json::to_vec(&manifest).expect("serialize");
        fs::write(temp.path().join(MANIFEST_FILE), &bytes).expect("write manifest");
        fs::write(temp.path().join(SIGNATURE_FILE), key.sign(&bytes).to_bytes())
            .expect("write sig");

        let config = ArtifactConfig::new(temp.path()).with_signing_pubkey(pubkey_b64);
        let err = load_artifacts(&config).expect_err("must fail");
        assert!(err.to_string().contains("must bind scaler.json"));
    }

    #[test]
    fn test_future_manifest_is_rejected() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());
        let (key, pubkey_b64) = signing_key_pair();

        let mut manifest = sign_artifacts(temp.path(), &key, None).expect("sign");
        manifest.created_at = Some(unix_now() + 3600);
        let bytes = serde_json::to_vec(&manifest).expect("serialize");
        fs::write(temp.path().join(MANIFEST_FILE), &bytes).expect("write manifest");
        fs::write(temp.path().join(SIGNATURE_FILE), key.sign(&bytes).to_bytes())
            .expect("write sig");

        let config = ArtifactConfig::new(temp.path()).with_signing_pubkey(pubkey_b64);
        let err = load_artifacts(&config).expect_err("must fail");
        assert!(err.to_string().contains("future"));
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_corrupt_model_is_model_unavailable() {
        let temp = tempdir().expect("tempdir");
        write_scaler(temp.path());
        fs::write(temp.path().join(MODEL_FILE), b"{\"kind\": \"logistic_regression\"")
            .expect("write model");

        let config = ArtifactConfig::new(temp.path()).allow_unsigned(true);
        assert!(matches!(
            load_artifacts(&config),
            Err(CardioriskError::ModelUnavailable(_))
        ));
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_corrupt_scaler_is_fatal() {
        let temp = tempdir().expect("tempdir");
        write_model(temp.path(), None);
        fs::write(temp.path().join(SCALER_FILE), b"[]").expect("write scaler");

        let config = ArtifactConfig::new(temp.path()).allow_unsigned(true);
        let err = load_artifacts(&config).expect_err("corrupt scaler must fail");
        assert!(matches!(err, CardioriskError::ScalerArtifactInvalid(_)));
        assert!(err.is_fatal());
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_unknown_schema_version_is_model_unavailable() {
        let temp = tempdir().expect("tempdir");
        write_model(temp.path(), Some("brfss-2031.v9"));
        write_scaler(temp.path());

        let config = ArtifactConfig::new(temp.path()).allow_unsigned(true);
        let err = load_artifacts(&config).expect_err("must fail");
        assert!(err.to_string().contains("brfss-2031.v9"));
    }

    #[test]
    fn test_malformed_pubkey() {
        assert!(verifying_key_from_b64("not base64!").is_err());
        assert!(verifying_key_from_b64("AAAA").is_err());
    }
}
