//! Artifact signing utility for Cardiorisk.
//!
//! Writes a signed manifest (`manifest.json`) and Ed25519 signature
//! (`model.sig`) binding `model.json` and `scaler.json`, or generates a new
//! signing key.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin sign_model -- <model_dir> [--serial <n>]
//! cargo run --bin sign_model -- --new-key <seed_path> [--pub <pub_path>] [--force]
//! ```
//!
//! # Security
//!
//! - Signing seed read from an FD, a file or a Docker secret
//! - New seeds written with 0600 permissions
//! - Seed material zeroized after use

use std::env;
use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
#[cfg(unix)]
use std::os::unix::io::FromRawFd;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::SigningKey;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use cardiorisk::adapters::artifact::{sign_artifacts, MANIFEST_FILE, SIGNATURE_FILE};

const KEY_FD_ENV: &str = "CARDIORISK_MODEL_SIGNING_KEY_B64_FD";
const KEY_FILE_ENV: &str = "CARDIORISK_MODEL_SIGNING_KEY_B64_FILE";
const KEY_DEV_ENV: &str = "CARDIORISK_MODEL_SIGNING_KEY_B64";
const DOCKER_SECRET_PATH: &str = "/run/secrets/cardiorisk_model_signing_key_b64";

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

enum Command {
    Sign {
        model_dir: PathBuf,
        serial: Option<u64>,
    },
    NewKey {
        seed_path: PathBuf,
        pub_path: Option<PathBuf>,
        force: bool,
    },
}

fn usage() -> String {
    "Usage:\n  sign_model <model_dir> [--serial <u64>]\n  sign_model --new-key <seed_path> [--pub <pub_path>] [--force]"
        .to_string()
}

fn parse_args() -> Result<Command, String> {
    let mut args = env::args().skip(1);
    let mut model_dir: Option<PathBuf> = None;
    let mut serial: Option<u64> = None;
    let mut seed_path: Option<PathBuf> = None;
    let mut pub_path: Option<PathBuf> = None;
    let mut force = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--serial" => {
                let v = args.next().ok_or_else(usage)?;
                serial = Some(
                    v.trim()
                        .parse::<u64>()
                        .map_err(|_| "--serial must be a u64".to_string())?,
                );
            }
            "--new-key" => seed_path = Some(PathBuf::from(args.next().ok_or_else(usage)?)),
            "--pub" => pub_path = Some(PathBuf::from(args.next().ok_or_else(usage)?)),
            "--force" => force = true,
            "-h" | "--help" => return Err(usage()),
            _ if arg.starts_with("--") => return Err(format!("Unknown arg: {arg}\n{}", usage())),
            _ => {
                if model_dir.replace(PathBuf::from(arg)).is_some() {
                    return Err(usage());
                }
            }
        }
    }

    match (seed_path, model_dir) {
        (Some(seed_path), None) => Ok(Command::NewKey {
            seed_path,
            pub_path,
            force,
        }),
        (None, Some(model_dir)) => Ok(Command::Sign { model_dir, serial }),
        _ => Err(usage()),
    }
}

fn trimmed_secret(raw: String) -> Result<Zeroizing<String>, String> {
    let raw = Zeroizing::new(raw);
    let secret = raw.trim_end_matches(['\n', '\r']).to_string();
    if secret.is_empty() {
        return Err("Empty signing key".to_string());
    }
    Ok(Zeroizing::new(secret))
}

fn read_signing_seed_b64() -> Result<Zeroizing<String>, String> {
    #[cfg(unix)]
    if let Ok(fd_str) = env::var(KEY_FD_ENV) {
        let fd: i32 = fd_str
            .trim()
            .parse()
            .map_err(|_| "Invalid key FD".to_string())?;
        if fd <= 2 {
            return Err("Refusing to read signing key from stdio FD".to_string());
        }
        // SAFETY: take ownership of FD for one-time secret read.
        let mut file = unsafe { fs::File::from_raw_fd(fd) };
        let mut buf = String::new();
        std::io::Read::read_to_string(&mut file, &mut buf)
            .map_err(|e| format!("Failed reading signing key from FD: {e}"))?;
        return trimmed_secret(buf);
    }

    if let Ok(path) = env::var(KEY_FILE_ENV) {
        let content = fs::read_to_string(path.trim())
            .map_err(|e| format!("Failed reading signing key file: {e}"))?;
        return trimmed_secret(content);
    }

    if Path::new(DOCKER_SECRET_PATH).exists() {
        let content = fs::read_to_string(DOCKER_SECRET_PATH)
            .map_err(|e| format!("Failed reading docker secret: {e}"))?;
        return trimmed_secret(content);
    }

    if cfg!(debug_assertions) {
        if let Ok(v) = env::var(KEY_DEV_ENV) {
            return trimmed_secret(v);
        }
    }

    Err(format!(
        "Missing signing key. Provide one of: {KEY_FD_ENV}, {KEY_FILE_ENV}, or {DOCKER_SECRET_PATH} ({KEY_DEV_ENV} only in debug builds)."
    ))
}

fn read_signing_seed() -> Result<Seed, String> {
    let v = read_signing_seed_b64()?;
    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(v.trim())
            .map_err(|e| format!("Invalid base64 in signing key: {e}"))?,
    );
    let bytes: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
        format!(
            "Signing key seed must be 32 bytes after base64 decode (got {})",
            raw.len()
        )
    })?;
    Ok(Seed(bytes))
}

fn write_key_file(path: &Path, contents: &str, mode: u32) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("Failed to create {parent:?}: {e}"))?;
    }
    let mut opts = fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        opts.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = opts
        .open(path)
        .map_err(|e| format!("Failed to open {path:?}: {e}"))?;
    file.write_all(contents.as_bytes())
        .and_then(|()| file.write_all(b"\n"))
        .map_err(|e| format!("Failed to write {path:?}: {e}"))
}

fn new_key(seed_path: &Path, pub_path: Option<&Path>, force: bool) -> Result<(), String> {
    for path in std::iter::once(seed_path).chain(pub_path) {
        if path.exists() && !force {
            return Err(format!(
                "Refusing to overwrite existing file {path:?}. Use --force."
            ));
        }
    }

    let mut seed = Seed([0u8; 32]);
    rand::rngs::OsRng.fill_bytes(&mut seed.0);
    let signing_key = SigningKey::from_bytes(&seed.0);
    let pub_b64 = general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes());
    let seed_b64 = Zeroizing::new(general_purpose::STANDARD.encode(seed.0));

    write_key_file(seed_path, &seed_b64, 0o600)?;
    println!("Wrote signing seed (base64) to {seed_path:?}");

    // Public key is non-secret.
    if let Some(pub_path) = pub_path {
        write_key_file(pub_path, &pub_b64, 0o644)?;
        println!("Wrote public key (base64) to {pub_path:?}");
    }
    println!("Verifying key (base64)={pub_b64}");
    Ok(())
}

fn sign(model_dir: &Path, serial: Option<u64>) -> Result<(), String> {
    let seed = read_signing_seed()?;
    let signing_key = SigningKey::from_bytes(&seed.0);
    drop(seed);

    let manifest = sign_artifacts(model_dir, &signing_key, serial)
        .map_err(|e| format!("Failed to sign artifacts in {model_dir:?}: {e}"))?;

    println!("Signed manifest: {:?}", model_dir.join(MANIFEST_FILE));
    println!("Wrote signature: {:?}", model_dir.join(SIGNATURE_FILE));
    for (file, digest) in &manifest.files {
        println!("  {file}  sha256={digest}");
    }
    println!(
        "Verifying key (base64)={}",
        general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes())
    );
    Ok(())
}

fn main() -> Result<(), String> {
    match parse_args()? {
        Command::NewKey {
            seed_path,
            pub_path,
            force,
        } => new_key(&seed_path, pub_path.as_deref(), force),
        Command::Sign { model_dir, serial } => sign(&model_dir, serial),
    }
}
