//! Errors for algorithm identifiers that are unknown or unsupported.

use core::fmt;

/// Which family of identifier was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmKind {
    /// Digest algorithm
    Hash,
    /// Signature algorithm
    Signature,
    /// Payload compression
    Compression,
    /// Package cipher
    Encryption,
    /// Block cipher mode
    CipherMode,
    /// OTA package type
    PackageType,
    /// OTA payload file type
    FileType,
    /// A/B target slot
    TargetSlot,
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlgorithmKind::Hash => write!(f, "hash algorithm"),
            AlgorithmKind::Signature => write!(f, "signature algorithm"),
            AlgorithmKind::Compression => write!(f, "compression type"),
            AlgorithmKind::Encryption => write!(f, "encryption algorithm"),
            AlgorithmKind::CipherMode => write!(f, "cipher mode"),
            AlgorithmKind::PackageType => write!(f, "package type"),
            AlgorithmKind::FileType => write!(f, "file type"),
            AlgorithmKind::TargetSlot => write!(f, "target slot"),
        }
    }
}

/// Unknown or unsupported algorithm errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlgorithmError {
    /// A name outside the supported set
    #[error("Unsupported {kind} '{value}' (supported: {supported})")]
    Unsupported {
        /// Identifier family
        kind: AlgorithmKind,
        /// Rejected value
        value: String,
        /// Comma-separated supported values
        supported: String,
    },

    /// A numeric wire identifier with no table entry
    #[error("Unknown {kind} identifier 0x{id:04X}")]
    UnknownId {
        /// Identifier family
        kind: AlgorithmKind,
        /// Rejected identifier
        id: u16,
    },
}

impl AlgorithmError {
    /// Create an unsupported-value error listing the accepted names.
    pub fn unsupported(kind: AlgorithmKind, value: impl Into<String>, supported: &[&str]) -> Self {
        AlgorithmError::Unsupported {
            kind,
            value: value.into(),
            supported: supported.join(", "),
        }
    }

    /// Create an unknown-identifier error.
    pub fn unknown_id(kind: AlgorithmKind, id: u16) -> Self {
        AlgorithmError::UnknownId { kind, id }
    }
}
