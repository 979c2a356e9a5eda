//! Hash and signature algorithm tables.
//!
//! Names, wire ids, and lengths are defined here once. Both sides of the
//! pipeline go through these tables, so an id the signer writes is always
//! one the verifier can resolve.

use core::fmt;
use std::str::FromStr;

use firmseal_errors::{AlgorithmError, AlgorithmKind};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

use crate::constants::{HASH_ID_SHA256, HASH_ID_SHA512, SIG_ID_RSA2048, SIG_ID_RSA4096};

/// Digest algorithm used for the header hash and manifest checksums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256, 32-byte digest
    #[default]
    Sha256,
    /// SHA-512, 64-byte digest
    Sha512,
}

impl HashAlgorithm {
    /// Accepted names, in wire-id order.
    pub const NAMES: &'static [&'static str] = &["sha256", "sha512"];

    /// Wire identifier stored in the header.
    pub fn id(self) -> u16 {
        match self {
            HashAlgorithm::Sha256 => HASH_ID_SHA256,
            HashAlgorithm::Sha512 => HASH_ID_SHA512,
        }
    }

    /// Resolve a wire identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AlgorithmError::UnknownId`] for ids outside the table.
    pub fn from_id(id: u16) -> Result<Self, AlgorithmError> {
        match id {
            HASH_ID_SHA256 => Ok(HashAlgorithm::Sha256),
            HASH_ID_SHA512 => Ok(HashAlgorithm::Sha512),
            other => Err(AlgorithmError::unknown_id(AlgorithmKind::Hash, other)),
        }
    }

    /// Lowercase algorithm name.
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    /// Digest length in bytes.
    pub fn digest_len(self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// Compute the digest of `data`.
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// Compute the lowercase hex digest of `data`.
    pub fn hex_digest(self, data: &[u8]) -> String {
        hex::encode(self.digest(data))
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = AlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha512" => Ok(HashAlgorithm::Sha512),
            _ => Err(AlgorithmError::unsupported(
                AlgorithmKind::Hash,
                s,
                Self::NAMES,
            )),
        }
    }
}

/// RSA-PSS signature algorithm, identified by modulus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureAlgorithm {
    /// RSA-2048 with PSS padding
    #[default]
    Rsa2048,
    /// RSA-4096 with PSS padding
    Rsa4096,
}

impl SignatureAlgorithm {
    /// Accepted names, in wire-id order.
    pub const NAMES: &'static [&'static str] = &["rsa2048", "rsa4096"];

    /// Wire identifier stored in the header.
    pub fn id(self) -> u16 {
        match self {
            SignatureAlgorithm::Rsa2048 => SIG_ID_RSA2048,
            SignatureAlgorithm::Rsa4096 => SIG_ID_RSA4096,
        }
    }

    /// Resolve a wire identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AlgorithmError::UnknownId`] for ids outside the table.
    pub fn from_id(id: u16) -> Result<Self, AlgorithmError> {
        match id {
            SIG_ID_RSA2048 => Ok(SignatureAlgorithm::Rsa2048),
            SIG_ID_RSA4096 => Ok(SignatureAlgorithm::Rsa4096),
            other => Err(AlgorithmError::unknown_id(AlgorithmKind::Signature, other)),
        }
    }

    /// Pick the algorithm matching an RSA modulus size.
    pub fn from_key_bits(bits: usize) -> Option<Self> {
        match bits {
            2048 => Some(SignatureAlgorithm::Rsa2048),
            4096 => Some(SignatureAlgorithm::Rsa4096),
            _ => None,
        }
    }

    /// Lowercase algorithm name.
    pub fn name(self) -> &'static str {
        match self {
            SignatureAlgorithm::Rsa2048 => "rsa2048",
            SignatureAlgorithm::Rsa4096 => "rsa4096",
        }
    }

    /// Modulus size in bits.
    pub fn key_bits(self) -> u32 {
        match self {
            SignatureAlgorithm::Rsa2048 => 2048,
            SignatureAlgorithm::Rsa4096 => 4096,
        }
    }

    /// Signature length in bytes, equal to the modulus length.
    pub fn signature_len(self) -> usize {
        match self {
            SignatureAlgorithm::Rsa2048 => 256,
            SignatureAlgorithm::Rsa4096 => 512,
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = AlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rsa2048" => Ok(SignatureAlgorithm::Rsa2048),
            "rsa4096" => Ok(SignatureAlgorithm::Rsa4096),
            _ => Err(AlgorithmError::unsupported(
                AlgorithmKind::Signature,
                s,
                Self::NAMES,
            )),
        }
    }
}
