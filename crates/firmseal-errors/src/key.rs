//! Errors for RSA key material.

/// Key loading and compatibility errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    /// Key file could not be read
    #[error("Cannot read key from {origin}: {reason}")]
    Unreadable {
        /// Path or description of the key source
        origin: String,
        /// Underlying reason
        reason: String,
    },

    /// Key material is valid PEM but not an RSA key
    #[error("Key from {origin} is not an RSA key (found {label})")]
    NotRsa {
        /// Path or description of the key source
        origin: String,
        /// PEM label or key type that was found
        label: String,
    },

    /// Key material could not be decoded
    #[error("Cannot parse key from {origin}: {reason}")]
    Parse {
        /// Path or description of the key source
        origin: String,
        /// Decoder error
        reason: String,
    },

    /// Modulus size without a signature algorithm identifier
    #[error("Unsupported RSA key size {bits} bits (supported: 2048, 4096)")]
    UnsupportedKeySize {
        /// Modulus size in bits
        bits: usize,
    },

    /// Configured key size disagrees with the loaded key
    #[error("Configured key size {expected} bits does not match the {actual}-bit key")]
    SizeMismatch {
        /// Configured size
        expected: u32,
        /// Size of the loaded key
        actual: usize,
    },

    /// An operation required a key that was not supplied
    #[error("No key supplied for {purpose}")]
    Missing {
        /// What the key was needed for
        purpose: &'static str,
    },

    /// Symmetric key material was empty or only whitespace
    #[error("Key material is empty")]
    EmptyMaterial,
}

impl KeyError {
    /// Create an unreadable-key error.
    pub fn unreadable(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        KeyError::Unreadable {
            origin: origin.into(),
            reason: reason.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        KeyError::Parse {
            origin: origin.into(),
            reason: reason.into(),
        }
    }
}
