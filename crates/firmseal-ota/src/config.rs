//! Builder configuration and per-build options.

use std::path::{Path, PathBuf};

use firmseal_errors::{FirmSealResult, IoResultExt};
use firmseal_header::HashAlgorithm;
use serde::{Deserialize, Serialize};

use crate::compression::CompressionType;
use crate::encryption::{CipherMode, EncryptionAlgorithm};
use crate::manifest::MANIFEST_FORMAT_VERSION;

/// Algorithms and defaults shared by every build of one builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtaBuilderConfig {
    /// Digest for file, manifest, and package checksums
    pub checksum_algorithm: HashAlgorithm,
    /// Codec used when `add_file` is given none
    pub default_compression: CompressionType,
    /// AES key size for package encryption
    pub encryption_algorithm: EncryptionAlgorithm,
    /// Cipher mode for package encryption
    pub cipher_mode: CipherMode,
    /// Digest used in the package signature
    pub signature_hash_algorithm: HashAlgorithm,
    /// Value written to the manifest `version` field
    pub manifest_version: String,
}

impl Default for OtaBuilderConfig {
    fn default() -> Self {
        Self {
            checksum_algorithm: HashAlgorithm::Sha256,
            default_compression: CompressionType::Gzip,
            encryption_algorithm: EncryptionAlgorithm::Aes256,
            cipher_mode: CipherMode::Gcm,
            signature_hash_algorithm: HashAlgorithm::Sha256,
            manifest_version: MANIFEST_FORMAT_VERSION.to_string(),
        }
    }
}

impl OtaBuilderConfig {
    /// Load a configuration from a JSON file. Missing fields take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, is not valid JSON, or names an
    /// unsupported algorithm.
    pub fn from_json_file(path: impl AsRef<Path>) -> FirmSealResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_path(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// What to do with the archive once it is assembled.
#[derive(Clone, Default)]
pub struct BuildOptions {
    /// Sign the final package bytes
    pub sign: bool,
    /// PEM private key for signing
    pub private_key_path: Option<PathBuf>,
    /// Encrypt the archive
    pub encrypt: bool,
    /// Hex key or raw passphrase for encryption
    pub encryption_key: Option<String>,
}

impl std::fmt::Debug for BuildOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildOptions")
            .field("sign", &self.sign)
            .field("private_key_path", &self.private_key_path)
            .field("encrypt", &self.encrypt)
            .field("encryption_key", &self.encryption_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl BuildOptions {
    /// Sign with the key at `private_key_path`.
    pub fn signed_with(mut self, private_key_path: impl Into<PathBuf>) -> Self {
        self.sign = true;
        self.private_key_path = Some(private_key_path.into());
        self
    }

    /// Encrypt with `key`.
    pub fn encrypted_with(mut self, key: impl Into<String>) -> Self {
        self.encrypt = true;
        self.encryption_key = Some(key.into());
        self
    }
}
