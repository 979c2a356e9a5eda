//! Fixed RSA key pairs and firmware blobs.

use std::fs;
use std::path::{Path, PathBuf};

use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::must::must_with;

/// PKCS#8 PEM of the primary 2048-bit signing key.
pub const RSA2048_PRIVATE_PEM: &str = include_str!("../keys/rsa2048.pem");
/// SPKI PEM of the primary 2048-bit key.
pub const RSA2048_PUBLIC_PEM: &str = include_str!("../keys/rsa2048.pub.pem");
/// PKCS#1 PEM of the primary 2048-bit signing key.
pub const RSA2048_PKCS1_PRIVATE_PEM: &str = include_str!("../keys/rsa2048_pkcs1.pem");
/// PKCS#1 PEM of the primary 2048-bit public key.
pub const RSA2048_PKCS1_PUBLIC_PEM: &str = include_str!("../keys/rsa2048_pkcs1.pub.pem");
/// PKCS#8 PEM of an unrelated 2048-bit key.
pub const RSA2048_OTHER_PRIVATE_PEM: &str = include_str!("../keys/rsa2048_other.pem");
/// SPKI PEM of the unrelated 2048-bit key.
pub const RSA2048_OTHER_PUBLIC_PEM: &str = include_str!("../keys/rsa2048_other.pub.pem");
/// PKCS#8 PEM of a 4096-bit signing key.
pub const RSA4096_PRIVATE_PEM: &str = include_str!("../keys/rsa4096.pem");
/// SPKI PEM of the 4096-bit key.
pub const RSA4096_PUBLIC_PEM: &str = include_str!("../keys/rsa4096.pub.pem");
/// PKCS#8 PEM of a 3072-bit key, a size with no signature algorithm id.
pub const RSA3072_PRIVATE_PEM: &str = include_str!("../keys/rsa3072.pem");
/// PKCS#8 PEM of a P-256 EC key.
pub const EC_P256_PRIVATE_PEM: &str = include_str!("../keys/ec_p256.pem");

/// Lowercase hex SHA-256 of the primary key's SPKI DER encoding.
pub const RSA2048_FINGERPRINT: &str =
    "67e4c1a18c5100d74be75d71def79438da4f2a87c094306b622beb3c44580b8d";

/// Primary 2048-bit private key.
pub fn rsa2048_private() -> RsaPrivateKey {
    must_with(RsaPrivateKey::from_pkcs8_pem(RSA2048_PRIVATE_PEM), "rsa2048 fixture")
}

/// Primary 2048-bit public key.
pub fn rsa2048_public() -> RsaPublicKey {
    must_with(RsaPublicKey::from_public_key_pem(RSA2048_PUBLIC_PEM), "rsa2048 fixture")
}

/// Unrelated 2048-bit public key.
pub fn rsa2048_other_public() -> RsaPublicKey {
    must_with(
        RsaPublicKey::from_public_key_pem(RSA2048_OTHER_PUBLIC_PEM),
        "rsa2048_other fixture",
    )
}

/// Paths of a key pair written into a test directory.
#[derive(Debug, Clone)]
pub struct KeyPairFiles {
    /// Private key PEM file
    pub private_key: PathBuf,
    /// Public key PEM file
    pub public_key: PathBuf,
}

/// Write the given PEM pair under `dir` as `<name>.pem` and `<name>.pub.pem`.
pub fn write_key_pair(dir: &Path, name: &str, private_pem: &str, public_pem: &str) -> KeyPairFiles {
    let private_key = dir.join(format!("{name}.pem"));
    let public_key = dir.join(format!("{name}.pub.pem"));
    must_with(fs::write(&private_key, private_pem), "writing private key");
    must_with(fs::write(&public_key, public_pem), "writing public key");
    KeyPairFiles {
        private_key,
        public_key,
    }
}

/// Write the primary 2048-bit pair under `dir`.
pub fn write_rsa2048_pair(dir: &Path) -> KeyPairFiles {
    write_key_pair(dir, "signing", RSA2048_PRIVATE_PEM, RSA2048_PUBLIC_PEM)
}

/// Deterministic pseudo-random firmware bytes.
pub fn firmware_blob(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(0x9E37_79B9).wrapping_add(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state.to_le_bytes()[0]
        })
        .collect()
}

/// Write a firmware blob to `dir/name` and return its path.
pub fn write_firmware(dir: &Path, name: &str, len: usize, seed: u32) -> PathBuf {
    let path = dir.join(name);
    must_with(fs::write(&path, firmware_blob(len, seed)), "writing firmware");
    path
}

/// Fresh temporary directory.
pub fn temp_dir() -> tempfile::TempDir {
    must_with(tempfile::tempdir(), "creating temp dir")
}
