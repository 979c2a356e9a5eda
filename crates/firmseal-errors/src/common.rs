//! Top-level error type and classification shared by every FirmSeal crate.

use core::fmt;
use std::path::{Path, PathBuf};

use crate::{AlgorithmError, FormatError, IntegrityError, KeyError, SignatureError};

/// Top-level error type wrapping every FirmSeal failure class.
#[derive(Debug, thiserror::Error)]
pub enum FirmSealError {
    /// Malformed binary header, archive, or manifest
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Unknown or unsupported algorithm identifier
    #[error("Algorithm error: {0}")]
    Algorithm(#[from] AlgorithmError),

    /// Unreadable or wrong-type key material
    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    /// Hash, CRC, or checksum mismatch
    #[error("Integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    /// RSA-PSS signing or verification failure
    #[error("Signature error: {0}")]
    Signature(#[from] SignatureError),

    /// Filesystem failure on a specific path
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path that was being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Package encryption or decryption failure
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Payload compression or decompression failure
    #[error("Compression error: {0}")]
    Compression(String),

    /// JSON encoding or decoding failure
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid builder or tool configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FirmSealError {
    /// Get the error category for classification.
    pub fn category(&self) -> ErrorCategory {
        match self {
            FirmSealError::Format(_) => ErrorCategory::Format,
            FirmSealError::Algorithm(_) => ErrorCategory::Algorithm,
            FirmSealError::Key(_) => ErrorCategory::Key,
            FirmSealError::Integrity(_) => ErrorCategory::Integrity,
            FirmSealError::Signature(_) => ErrorCategory::Signature,
            FirmSealError::Io { .. } => ErrorCategory::Io,
            FirmSealError::Encryption(_) => ErrorCategory::Encryption,
            FirmSealError::Compression(_) => ErrorCategory::Compression,
            FirmSealError::Serialization(_) => ErrorCategory::Serialization,
            FirmSealError::Config(_) => ErrorCategory::Config,
        }
    }

    /// Create an I/O error tagged with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FirmSealError::Io {
            path: path.into(),
            source,
        }
    }

    /// True when this is an I/O error for a path that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FirmSealError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }

    /// Create a configuration error with a message.
    pub fn config(msg: impl Into<String>) -> Self {
        FirmSealError::Config(msg.into())
    }

    /// Create an encryption error with a message.
    pub fn encryption(msg: impl Into<String>) -> Self {
        FirmSealError::Encryption(msg.into())
    }

    /// Create a compression error with a message.
    pub fn compression(msg: impl Into<String>) -> Self {
        FirmSealError::Compression(msg.into())
    }
}

impl From<serde_json::Error> for FirmSealError {
    fn from(e: serde_json::Error) -> Self {
        FirmSealError::Serialization(e.to_string())
    }
}

/// Error category for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCategory {
    /// Malformed input
    Format = 0,
    /// Unknown algorithm identifier
    Algorithm = 1,
    /// Key material problems
    Key = 2,
    /// Digest or CRC mismatch
    Integrity = 3,
    /// Signature problems
    Signature = 4,
    /// Filesystem errors
    Io = 5,
    /// Cipher errors
    Encryption = 6,
    /// Codec errors
    Compression = 7,
    /// JSON errors
    Serialization = 8,
    /// Configuration errors
    Config = 9,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Format => write!(f, "Format"),
            ErrorCategory::Algorithm => write!(f, "Algorithm"),
            ErrorCategory::Key => write!(f, "Key"),
            ErrorCategory::Integrity => write!(f, "Integrity"),
            ErrorCategory::Signature => write!(f, "Signature"),
            ErrorCategory::Io => write!(f, "IO"),
            ErrorCategory::Encryption => write!(f, "Encryption"),
            ErrorCategory::Compression => write!(f, "Compression"),
            ErrorCategory::Serialization => write!(f, "Serialization"),
            ErrorCategory::Config => write!(f, "Config"),
        }
    }
}

/// Extension trait attaching a path to raw `std::io` results.
pub trait IoResultExt<T> {
    /// Convert an I/O failure into [`FirmSealError::Io`] naming `path`.
    fn with_path(self, path: impl AsRef<Path>) -> Result<T, FirmSealError>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl AsRef<Path>) -> Result<T, FirmSealError> {
        self.map_err(|source| FirmSealError::io(path.as_ref(), source))
    }
}
