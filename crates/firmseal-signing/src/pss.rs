//! RSA-PSS primitive shared by firmware and package signing.
//!
//! The message is hashed with the configured digest, MGF1 uses the same
//! digest, and the salt is the largest the modulus allows:
//! `ceil((modBits - 1) / 8) - hLen - 2`. Verification recomputes the same
//! salt length from the public key.

use firmseal_errors::SignatureError;
use firmseal_header::HashAlgorithm;
use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Pss, RsaPrivateKey, RsaPublicKey};
use sha2::{Sha256, Sha512};

/// Maximum PSS salt length for `key` and `hash`.
pub fn max_salt_len(key: &impl PublicKeyParts, hash: HashAlgorithm) -> usize {
    let em_bits = key.n().bits().saturating_sub(1);
    em_bits
        .div_ceil(8)
        .saturating_sub(hash.digest_len().saturating_add(2))
}

fn scheme(hash: HashAlgorithm, salt_len: usize) -> Pss {
    match hash {
        HashAlgorithm::Sha256 => Pss::new_with_salt::<Sha256>(salt_len),
        HashAlgorithm::Sha512 => Pss::new_with_salt::<Sha512>(salt_len),
    }
}

/// Sign `data` with RSA-PSS.
///
/// # Errors
///
/// Returns [`SignatureError::SigningFailed`] if the key is too small for the
/// digest or the private-key operation fails.
pub fn sign(key: &RsaPrivateKey, hash: HashAlgorithm, data: &[u8]) -> Result<Vec<u8>, SignatureError> {
    let digest = hash.digest(data);
    let salt_len = max_salt_len(key, hash);
    key.sign_with_rng(&mut OsRng, scheme(hash, salt_len), &digest)
        .map_err(|e| SignatureError::SigningFailed(e.to_string()))
}

/// Verify an RSA-PSS `signature` over `data`.
///
/// # Errors
///
/// Returns [`SignatureError::VerificationFailed`] when the signature does
/// not match.
pub fn verify(
    key: &RsaPublicKey,
    hash: HashAlgorithm,
    data: &[u8],
    signature: &[u8],
) -> Result<(), SignatureError> {
    let digest = hash.digest(data);
    let salt_len = max_salt_len(key, hash);
    key.verify(scheme(hash, salt_len), &digest, signature)
        .map_err(|e| SignatureError::VerificationFailed(e.to_string()))
}
