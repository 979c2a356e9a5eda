//! Signer configuration.

use std::path::Path;

use firmseal_errors::{FirmSealResult, IoResultExt};
use firmseal_header::HashAlgorithm;
use serde::{Deserialize, Serialize};

/// Settings chosen when a [`FirmwareSigner`](crate::FirmwareSigner) is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
    /// Digest used for the header hash and the PSS encoding
    pub hash_algorithm: HashAlgorithm,
    /// Expected modulus size; `None` accepts whatever the key provides
    pub key_size: Option<u32>,
}

impl SignerConfig {
    /// Configuration with the given digest and no key size constraint.
    pub fn with_hash(hash_algorithm: HashAlgorithm) -> Self {
        Self {
            hash_algorithm,
            key_size: None,
        }
    }

    /// Require the loaded key to have `bits` modulus bits.
    pub fn require_key_size(mut self, bits: u32) -> Self {
        self.key_size = Some(bits);
        self
    }

    /// Load a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a valid configuration.
    pub fn from_json_file(path: impl AsRef<Path>) -> FirmSealResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_path(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
