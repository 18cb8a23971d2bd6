//! Stable extension identity.
//!
//! An unpacked extension gets a random id unless its manifest carries a
//! `key`. We keep one RSA key per project in the cache directory and derive
//! both the manifest key and the id from it, so the id survives restarts,
//! rebuilds and fresh browser profiles.
//!
//! The cached PEM is the single source of truth: delete it (or run
//! `extreload rotate-key`) and the extension gets a new identity.

mod id;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use thiserror::Error;

pub use id::{EXTENSION_ID_LEN, extension_id, is_extension_id};

/// File name of the cached private key inside the cache directory.
pub const KEY_FILE: &str = "key.pem";

/// RSA modulus size for generated keys.
pub const KEY_BITS: usize = 2048;

/// Identity setup failures. All of them abort startup.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("failed to access key cache `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to generate RSA key")]
    Generate(#[source] rsa::Error),

    #[error("cached key `{0}` is not a PKCS#8 RSA private key")]
    Decode(PathBuf, #[source] rsa::pkcs8::Error),

    #[error("failed to encode private key")]
    EncodePrivate(#[source] rsa::pkcs8::Error),

    #[error("failed to encode public key")]
    EncodePublic(#[source] rsa::pkcs8::spki::Error),
}

/// The key material and the values derived from it.
pub struct ExtensionIdentity {
    manifest_key: String,
    extension_id: String,
}

impl ExtensionIdentity {
    /// Derive every public value from a private key.
    pub fn from_private_key(private_key: &RsaPrivateKey) -> Result<Self, IdentityError> {
        let public_key_der = RsaPublicKey::from(private_key)
            .to_public_key_der()
            .map_err(IdentityError::EncodePublic)?;
        let der = public_key_der.as_bytes();

        Ok(Self {
            manifest_key: BASE64.encode(der),
            extension_id: extension_id(der),
        })
    }

    /// Value for the manifest's `key` field.
    pub fn manifest_key(&self) -> &str {
        &self.manifest_key
    }

    /// The 32-letter id the browser will assign.
    pub fn extension_id(&self) -> &str {
        &self.extension_id
    }
}

impl std::fmt::Debug for ExtensionIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionIdentity")
            .field("extension_id", &self.extension_id)
            .finish_non_exhaustive()
    }
}

/// Path of the cached private key for `cache_dir`.
pub fn key_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(KEY_FILE)
}

/// Load the cached identity, generating and persisting one on first run.
pub fn get_or_create_identity(cache_dir: &Path) -> Result<ExtensionIdentity, IdentityError> {
    let path = key_path(cache_dir);

    let private_key = if path.exists() {
        let pem = fs::read_to_string(&path).map_err(|e| IdentityError::Io(path.clone(), e))?;
        crate::debug!("identity"; "loaded key from {}", path.display());
        RsaPrivateKey::from_pkcs8_pem(&pem).map_err(|e| IdentityError::Decode(path.clone(), e))?
    } else {
        let key = generate_key()?;
        persist_key(&key, &path)?;
        crate::log!("identity"; "generated new extension key at {}", path.display());
        key
    };

    ExtensionIdentity::from_private_key(&private_key)
}

/// Discard the cached key and create a fresh identity.
pub fn rotate_identity(cache_dir: &Path) -> Result<ExtensionIdentity, IdentityError> {
    let path = key_path(cache_dir);
    if path.exists() {
        fs::remove_file(&path).map_err(|e| IdentityError::Io(path.clone(), e))?;
    }
    get_or_create_identity(cache_dir)
}

fn generate_key() -> Result<RsaPrivateKey, IdentityError> {
    let mut rng = rand::rngs::OsRng;
    RsaPrivateKey::new(&mut rng, KEY_BITS).map_err(IdentityError::Generate)
}

fn persist_key(key: &RsaPrivateKey, path: &Path) -> Result<(), IdentityError> {
    let pem = key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(IdentityError::EncodePrivate)?;

    let io_err = |e: std::io::Error| IdentityError::Io(path.to_path_buf(), e);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(io_err)?;
    file.write_all(pem.as_bytes()).map_err(io_err)
}
