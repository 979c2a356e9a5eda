//! Errors for malformed binary headers, archives, and manifests.

/// Structural problems with input bytes or documents.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// Buffer shorter than the structure it should contain
    #[error("{what} is truncated: expected at least {expected} bytes, got {actual}")]
    Truncated {
        /// What was being decoded
        what: &'static str,
        /// Minimum length required
        expected: usize,
        /// Length actually available
        actual: usize,
    },

    /// Magic bytes do not match
    #[error(
        "Invalid magic: expected \"{}\", found \"{}\"",
        .expected.escape_ascii(),
        .found.escape_ascii()
    )]
    BadMagic {
        /// Expected magic value
        expected: [u8; 4],
        /// Magic value found in the buffer
        found: [u8; 4],
    },

    /// A length field points past the end of the buffer
    #[error("Declared {field} of {declared} bytes exceeds the {available} bytes available")]
    DeclaredSizeExceedsBuffer {
        /// Name of the length field
        field: &'static str,
        /// Value of the length field
        declared: u64,
        /// Bytes actually remaining
        available: u64,
    },

    /// A value does not fit in its fixed-width wire field
    #[error("Field '{field}' value {value} overflows its width (max: {max})")]
    FieldOverflow {
        /// Field name
        field: &'static str,
        /// Offending value
        value: u64,
        /// Largest representable value
        max: u64,
    },

    /// Version string that is not `MAJOR.MINOR.PATCH[.BUILD]`
    #[error("Invalid version string '{input}': {reason}")]
    InvalidVersion {
        /// Input as given
        input: String,
        /// Why it was rejected
        reason: String,
    },

    /// Zero-length firmware cannot be signed
    #[error("Firmware image is empty")]
    EmptyFirmware,

    /// Malformed or unexpected tar archive
    #[error("Invalid archive: {0}")]
    Archive(String),

    /// Manifest document does not match the expected schema
    #[error("Invalid manifest: {0}")]
    Manifest(String),

    /// Delta patch stream that cannot be applied
    #[error("Invalid delta patch: {0}")]
    Patch(String),
}

impl FormatError {
    /// Create a truncation error.
    pub fn truncated(what: &'static str, expected: usize, actual: usize) -> Self {
        FormatError::Truncated {
            what,
            expected,
            actual,
        }
    }

    /// Create a field overflow error.
    pub fn overflow(field: &'static str, value: u64, max: u64) -> Self {
        FormatError::FieldOverflow { field, value, max }
    }

    /// Create an invalid version error.
    pub fn invalid_version(input: impl Into<String>, reason: impl Into<String>) -> Self {
        FormatError::InvalidVersion {
            input: input.into(),
            reason: reason.into(),
        }
    }
}
