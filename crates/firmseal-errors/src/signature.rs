//! Errors raised by the RSA-PSS primitive.

/// Signing and verification failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// The private-key operation failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// The signature does not verify under the given key
    #[error("Signature verification failed: {0}")]
    VerificationFailed(String),
}
