//! Reports returned by signing and verification, single and batch.

use std::path::{Path, PathBuf};

use firmseal_errors::{FirmSealError, FirmSealResult, IoResultExt};
use firmseal_header::HeaderSummary;
use serde::{Deserialize, Serialize};

/// Outcome of signing one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignReport {
    /// Unsigned input
    pub input_file: PathBuf,
    /// Signed output
    pub output_file: PathBuf,
    /// Dotted firmware version
    pub version: String,
    /// Firmware length
    pub firmware_size: u64,
    /// Signed image length
    pub signed_size: u64,
    /// Digest name
    pub hash_algorithm: String,
    /// Signature algorithm name
    pub signature_algorithm: String,
    /// Hex digest of the firmware
    pub hash: String,
    /// CRC32 as `0xNNNNNNNN`
    pub crc32: String,
    /// Signature length
    pub signature_size: u64,
    /// RFC 3339 signing time
    pub timestamp: String,
}

/// Independent pass/fail result for each header field check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderChecks {
    /// Magic matches
    pub magic: bool,
    /// Version is set (not 0.0.0.0)
    pub version: bool,
    /// Timestamp is non-zero
    pub timestamp: bool,
    /// Firmware size is non-zero
    pub firmware_size: bool,
    /// Hash algorithm id is in the table
    pub hash_algorithm: bool,
    /// Signature algorithm id is in the table
    pub signature_algorithm: bool,
    /// Signature size is non-zero
    pub signature_size: bool,
}

impl HeaderChecks {
    /// Check names with their results, in header order.
    pub fn entries(&self) -> [(&'static str, bool); 7] {
        [
            ("magic", self.magic),
            ("version", self.version),
            ("timestamp", self.timestamp),
            ("firmware_size", self.firmware_size),
            ("hash_algorithm", self.hash_algorithm),
            ("signature_algorithm", self.signature_algorithm),
            ("signature_size", self.signature_size),
        ]
    }

    /// True when every check passed.
    pub fn all_passed(&self) -> bool {
        self.entries().iter().all(|(_, ok)| *ok)
    }

    /// Names of the checks that failed.
    pub fn failed_fields(&self) -> Vec<&'static str> {
        self.entries()
            .into_iter()
            .filter_map(|(name, ok)| (!ok).then_some(name))
            .collect()
    }
}

/// Every verification facet of one signed image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Source file, when verified from disk
    pub file: Option<PathBuf>,
    /// Image length
    pub file_size: u64,
    /// Decoded header
    pub header: HeaderSummary,
    /// Per-field header checks
    pub header_checks: HeaderChecks,
    /// All header checks passed
    pub header_valid: bool,
    /// Recomputed digest matches the stored one
    pub hash_valid: bool,
    /// Recomputed CRC32 matches
    pub crc_valid: bool,
    /// `None` when no public key was supplied
    pub signature_valid: Option<bool>,
    /// Header, hash, and CRC valid, and the signature not rejected
    pub overall_valid: bool,
    /// RFC 3339 verification time
    pub verified_at: String,
}

impl VerificationReport {
    /// 0 when the image is valid, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.overall_valid)
    }
}

/// Whether a successful batch item counts as passed.
pub trait BatchOutcome {
    /// True if the item passed.
    fn passed(&self) -> bool;
}

impl BatchOutcome for SignReport {
    fn passed(&self) -> bool {
        true
    }
}

impl BatchOutcome for VerificationReport {
    fn passed(&self) -> bool {
        self.overall_valid
    }
}

/// An item that failed with an error instead of producing a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    /// Input that failed
    pub input_file: PathBuf,
    /// Error message
    pub error: String,
    /// Error category
    pub category: String,
    /// RFC 3339 failure time
    pub timestamp: String,
}

impl BatchFailure {
    /// Record `error` against `input_file`.
    pub fn new(input_file: impl Into<PathBuf>, error: &FirmSealError) -> Self {
        Self {
            input_file: input_file.into(),
            error: error.to_string(),
            category: error.category().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// One batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchEntry<T> {
    /// The operation produced a report
    Completed(T),
    /// The operation failed
    Failed(BatchFailure),
}

impl<T: BatchOutcome> BatchEntry<T> {
    /// True if the item completed and passed.
    pub fn passed(&self) -> bool {
        match self {
            BatchEntry::Completed(report) => report.passed(),
            BatchEntry::Failed(_) => false,
        }
    }
}

/// Batch totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Items processed
    pub total: usize,
    /// Items that passed
    pub passed: usize,
    /// Items that failed or errored
    pub failed: usize,
    /// Percentage of items that passed
    pub success_rate: f64,
}

/// Per-item results plus totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport<T> {
    /// One entry per input, in input order
    pub results: Vec<BatchEntry<T>>,
    /// Totals over `results`
    pub summary: BatchSummary,
}

/// Result of [`FirmwareSigner::sign_batch`](crate::FirmwareSigner::sign_batch).
pub type BatchSignReport = BatchReport<SignReport>;

/// Result of [`FirmwareVerifier::verify_batch`](crate::FirmwareVerifier::verify_batch).
pub type BatchVerifyReport = BatchReport<VerificationReport>;

impl<T: BatchOutcome + Serialize> BatchReport<T> {
    /// Build a report and its totals from per-item entries.
    pub fn from_entries(results: Vec<BatchEntry<T>>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|entry| entry.passed()).count();
        let failed = total.saturating_sub(passed);
        let success_rate = if total == 0 {
            0.0
        } else {
            passed as f64 / total as f64 * 100.0
        };

        Self {
            results,
            summary: BatchSummary {
                total,
                passed,
                failed,
                success_rate,
            },
        }
    }

    /// 0 when no item failed, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        i32::from(self.summary.failed > 0)
    }

    /// Reports of the items that completed.
    pub fn completed(&self) -> impl Iterator<Item = &T> {
        self.results.iter().filter_map(|entry| match entry {
            BatchEntry::Completed(report) => Some(report),
            BatchEntry::Failed(_) => None,
        })
    }

    /// Items that failed with an error.
    pub fn failures(&self) -> impl Iterator<Item = &BatchFailure> {
        self.results.iter().filter_map(|entry| match entry {
            BatchEntry::Failed(failure) => Some(failure),
            BatchEntry::Completed(_) => None,
        })
    }

    /// Save the report as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an I/O or serialization error.
    pub fn write_json(&self, path: &Path) -> FirmSealResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_path(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_report(name: &str) -> SignReport {
        SignReport {
            input_file: PathBuf::from(name),
            output_file: PathBuf::from(format!("{name}.signed")),
            version: "1.0.0.0".into(),
            firmware_size: 10,
            signed_size: 778,
            hash_algorithm: "sha256".into(),
            signature_algorithm: "rsa2048".into(),
            hash: "00".into(),
            crc32: "0x00000000".into(),
            signature_size: 256,
            timestamp: "2024-01-01T00:00:00+00:00".into(),
        }
    }

    #[test]
    fn test_summary_counts() {
        let failure = BatchFailure::new("c.bin", &FirmSealError::config("boom"));
        let report = BatchReport::from_entries(vec![
            BatchEntry::Completed(sign_report("a.bin")),
            BatchEntry::Completed(sign_report("b.bin")),
            BatchEntry::Failed(failure),
        ]);
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.passed, 2);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.completed().count(), 2);
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn test_empty_batch_succeeds() {
        let report = BatchSignReport::from_entries(Vec::new());
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.summary.total, 0);
    }

    #[test]
    fn test_header_checks_failed_fields() {
        let checks = HeaderChecks {
            magic: true,
            version: true,
            timestamp: false,
            firmware_size: true,
            hash_algorithm: false,
            signature_algorithm: true,
            signature_size: true,
        };
        assert!(!checks.all_passed());
        assert_eq!(checks.failed_fields(), vec!["timestamp", "hash_algorithm"]);
    }

    #[test]
    fn test_failure_entry_json_shape() -> Result<(), serde_json::Error> {
        let failure = BatchFailure::new("missing.bin", &FirmSealError::config("boom"));
        let json = serde_json::to_value(BatchEntry::<SignReport>::Failed(failure))?;
        assert_eq!(json["input_file"], "missing.bin");
        assert_eq!(json["category"], "Config");
        Ok(())
    }
}
