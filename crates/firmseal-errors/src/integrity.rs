//! Errors for digest, CRC, and size mismatches.

/// Integrity check failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    /// Recomputed digest differs from the recorded one
    #[error("{subject} checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch {
        /// What was checked
        subject: String,
        /// Recorded value
        expected: String,
        /// Recomputed value
        actual: String,
    },

    /// Recovered length differs from the recorded one
    #[error("{subject} size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// What was checked
        subject: String,
        /// Recorded size
        expected: u64,
        /// Actual size
        actual: u64,
    },
}

impl IntegrityError {
    /// Create a checksum mismatch error.
    pub fn checksum(
        subject: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        IntegrityError::ChecksumMismatch {
            subject: subject.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
