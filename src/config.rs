//! Environment-driven configuration.
//!
//! Every setting has a `CARDIORISK_*` variable. Configuration is resolved once
//! at startup and passed down as a value; library code never reads the
//! environment on its own.

use std::path::PathBuf;

pub const MODEL_PATH_ENV: &str = "CARDIORISK_MODEL_PATH";
pub const ALLOW_UNSIGNED_MODELS_ENV: &str = "CARDIORISK_ALLOW_UNSIGNED_MODELS";
pub const SIGNING_PUBKEY_FILE_ENV: &str = "CARDIORISK_MODEL_SIGNING_PUBKEY_B64_FILE";
pub const MODEL_MAX_AGE_ENV: &str = "CARDIORISK_MODEL_MAX_AGE_SECS";
pub const WORKERS_ENV: &str = "CARDIORISK_WORKERS";
pub const LOG_MODE_ENV: &str = "CARDIORISK_LOG_MODE";
pub const LOG_FILE_ENV: &str = "CARDIORISK_LOG_FILE";

const DEFAULT_MODEL_PATH: &str = "models";
const DEFAULT_LOG_FILE: &str = "cardiorisk.log";

/// Interpret common truthy spellings.
#[must_use]
pub fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "yes" | "YES")
}

fn env_bool(name: &str) -> bool {
    std::env::var(name).map(|v| parse_bool(&v)).unwrap_or(false)
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Where the trained artifacts live and how strictly they are verified.
#[derive(Debug, Clone)]
pub struct ArtifactConfig {
    /// Directory holding `model.json`, `scaler.json` and, when signed,
    /// `manifest.json` + `model.sig`
    pub model_dir: PathBuf,

    /// Accept artifacts without a signed manifest. Ignored in release builds.
    pub allow_unsigned: bool,

    /// Base64 Ed25519 verifying key; signed artifacts cannot load without it
    pub signing_pubkey_b64: Option<String>,

    /// Refuse manifests older than this many seconds
    pub max_age_secs: Option<i64>,
}

impl ArtifactConfig {
    /// Strict configuration for a directory: signatures required.
    #[must_use]
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            allow_unsigned: false,
            signing_pubkey_b64: None,
            max_age_secs: None,
        }
    }

    #[must_use]
    pub fn allow_unsigned(mut self, allow: bool) -> Self {
        self.allow_unsigned = allow;
        self
    }

    #[must_use]
    pub fn with_signing_pubkey(mut self, b64: impl Into<String>) -> Self {
        self.signing_pubkey_b64 = Some(b64.into());
        self
    }

    /// Resolve from the environment.
    ///
    /// # Errors
    /// Returns an I/O error if the configured verifying-key file is unreadable.
    pub fn from_env() -> std::io::Result<Self> {
        let model_dir = std::env::var(MODEL_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_PATH));

        let signing_pubkey_b64 = match std::env::var(SIGNING_PUBKEY_FILE_ENV) {
            Ok(path) => Some(std::fs::read_to_string(path.trim())?.trim().to_string()),
            Err(_) => None,
        };

        Ok(Self {
            model_dir,
            allow_unsigned: env_bool(ALLOW_UNSIGNED_MODELS_ENV),
            signing_pubkey_b64,
            max_age_secs: env_parse::<i64>(MODEL_MAX_AGE_ENV).filter(|&v| v > 0),
        })
    }
}

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Stdout,
    File,
    /// File when stdout is a terminal, stdout otherwise
    Auto,
}

impl LogMode {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "stdout" => Self::Stdout,
            "file" => Self::File,
            _ => Self::Auto,
        }
    }

    /// Whether to log to a file given the current terminal state.
    #[must_use]
    pub fn use_file(self, interactive: bool) -> bool {
        match self {
            Self::Stdout => false,
            Self::File => true,
            Self::Auto => interactive,
        }
    }
}

/// Complete process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub artifacts: ArtifactConfig,
    pub workers: usize,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
}

impl AppConfig {
    /// Resolve from the environment.
    ///
    /// # Errors
    /// Returns an I/O error if a referenced secret file is unreadable.
    pub fn from_env() -> std::io::Result<Self> {
        let default_workers = std::thread::available_parallelism()
            .map(usize::from)
            .unwrap_or(1);

        Ok(Self {
            artifacts: ArtifactConfig::from_env()?,
            workers: env_parse::<usize>(WORKERS_ENV)
                .filter(|&n| n > 0)
                .unwrap_or(default_workers),
            log_mode: std::env::var(LOG_MODE_ENV)
                .map(|v| LogMode::parse(&v))
                .unwrap_or(LogMode::Auto),
            log_file: std::env::var(LOG_FILE_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_FILE)),
        })
    }
}
