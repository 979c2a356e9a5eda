//! Firmware verifier.

use std::path::{Path, PathBuf};

use firmseal_errors::{FirmSealResult, IoResultExt};
use firmseal_header::{FirmwareHeader, HashAlgorithm, MAGIC, SignatureAlgorithm};
use rsa::RsaPublicKey;
use subtle::ConstantTimeEq;
use tracing::{debug, error, info, warn};

use crate::batch::collect_inputs;
use crate::image::ParsedFirmware;
use crate::report::{BatchEntry, BatchFailure, BatchVerifyReport, HeaderChecks, VerificationReport};
use crate::{keys, pss};

/// Re-checks the header, digest, CRC32, and signature of signed images.
///
/// Without a public key the signature check reports `None` and the other
/// checks still run.
#[derive(Debug, Clone, Default)]
pub struct FirmwareVerifier {
    public_key: Option<RsaPublicKey>,
}

impl FirmwareVerifier {
    /// Verifier with an optional public key.
    pub fn new(public_key: Option<RsaPublicKey>) -> Self {
        if public_key.is_none() {
            warn!("No public key supplied; signatures will not be checked");
        }
        Self { public_key }
    }

    /// Verifier with a PEM public key loaded from `path`.
    ///
    /// # Errors
    ///
    /// Returns a key error if the file is unreadable or not an RSA key.
    pub fn from_key_file(path: impl AsRef<Path>) -> FirmSealResult<Self> {
        Ok(Self::new(Some(keys::load_public_key(path.as_ref())?)))
    }

    /// True when signatures will be checked.
    pub fn has_public_key(&self) -> bool {
        self.public_key.is_some()
    }

    /// Split a signed image into header, firmware, and signature.
    ///
    /// # Errors
    ///
    /// Returns a format error for a short buffer, bad magic, or a declared
    /// size that runs past the end of `bytes`.
    pub fn parse_signed_firmware(bytes: &[u8]) -> FirmSealResult<ParsedFirmware<'_>> {
        let parsed = ParsedFirmware::parse(bytes)?;
        if parsed.trailing > 0 {
            debug!(trailing = parsed.trailing, "Ignoring bytes after the signature");
        }
        Ok(parsed)
    }

    /// Check each header field on its own.
    pub fn verify_header(&self, header: &FirmwareHeader) -> HeaderChecks {
        HeaderChecks {
            magic: header.magic == MAGIC,
            version: !header.version.is_zero(),
            timestamp: header.timestamp > 0,
            firmware_size: header.firmware_size > 0,
            hash_algorithm: HashAlgorithm::from_id(header.hash_algorithm_id).is_ok(),
            signature_algorithm: SignatureAlgorithm::from_id(header.signature_algorithm_id).is_ok(),
            signature_size: header.signature_size > 0,
        }
    }

    /// Recompute the digest named by the header and compare it with the
    /// first digest-length bytes of the stored hash field.
    pub fn verify_firmware_hash(&self, header: &FirmwareHeader, firmware: &[u8]) -> bool {
        let Ok(algorithm) = header.hash_algorithm() else {
            error!(id = header.hash_algorithm_id, "Unknown hash algorithm id");
            return false;
        };
        let computed = algorithm.digest(firmware);
        header
            .stored_digest(computed.len())
            .is_some_and(|stored| bool::from(stored.ct_eq(&computed)))
    }

    /// Recompute the CRC32 and compare it with the header.
    pub fn verify_crc32(&self, header: &FirmwareHeader, firmware: &[u8]) -> bool {
        crc32fast::hash(firmware) == header.crc32
    }

    /// `Some(valid)` with a public key, `None` without one.
    pub fn verify_signature(
        &self,
        header: &FirmwareHeader,
        firmware: &[u8],
        signature: &[u8],
    ) -> Option<bool> {
        let public_key = self.public_key.as_ref()?;
        let Ok(algorithm) = header.hash_algorithm() else {
            return Some(false);
        };
        match pss::verify(public_key, algorithm, firmware, signature) {
            Ok(()) => Some(true),
            Err(e) => {
                debug!(error = %e, "Signature rejected");
                Some(false)
            }
        }
    }

    /// Run every check on an in-memory image.
    ///
    /// All checks run even after one fails, so the report shows every
    /// failing facet at once.
    ///
    /// # Errors
    ///
    /// Fails only when the image cannot be parsed at all.
    pub fn verify_bytes(&self, bytes: &[u8]) -> FirmSealResult<VerificationReport> {
        let parsed = Self::parse_signed_firmware(bytes)?;
        let header = &parsed.header;

        let header_checks = self.verify_header(header);
        let header_valid = header_checks.all_passed();
        let hash_valid = self.verify_firmware_hash(header, parsed.firmware);
        let crc_valid = self.verify_crc32(header, parsed.firmware);
        let signature_valid = self.verify_signature(header, parsed.firmware, parsed.signature);

        let overall_valid =
            header_valid && hash_valid && crc_valid && signature_valid != Some(false);

        if !header_valid {
            warn!(failed = ?header_checks.failed_fields(), "Header checks failed");
        }
        debug!(
            header_valid,
            hash_valid,
            crc_valid,
            ?signature_valid,
            overall_valid,
            "Image verified"
        );

        Ok(VerificationReport {
            file: None,
            file_size: bytes.len() as u64,
            header: header.summary(),
            header_checks,
            header_valid,
            hash_valid,
            crc_valid,
            signature_valid,
            overall_valid,
            verified_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Run every check on the image stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or a format error if
    /// it cannot be parsed.
    pub fn verify_file(&self, path: &Path) -> FirmSealResult<VerificationReport> {
        let bytes = std::fs::read(path).with_path(path)?;
        let mut report = self.verify_bytes(&bytes)?;
        report.file = Some(path.to_path_buf());

        info!(
            file = %path.display(),
            valid = report.overall_valid,
            "Verification finished"
        );
        Ok(report)
    }

    /// Verify each path, recording unreadable or unparsable images as
    /// failed entries without stopping.
    pub fn verify_batch(&self, paths: &[PathBuf]) -> BatchVerifyReport {
        let results = paths
            .iter()
            .map(|path| match self.verify_file(path) {
                Ok(report) => BatchEntry::Completed(report),
                Err(e) => {
                    error!(file = %path.display(), error = %e, "Batch verification failed");
                    BatchEntry::Failed(BatchFailure::new(path, &e))
                }
            })
            .collect();

        let report = BatchVerifyReport::from_entries(results);
        info!(
            total = report.summary.total,
            passed = report.summary.passed,
            failed = report.summary.failed,
            "Batch verification complete"
        );
        report
    }

    /// Verify every file in `dir` matching `pattern`.
    ///
    /// # Errors
    ///
    /// Fails only if the pattern is invalid or the directory cannot be
    /// listed.
    pub fn verify_directory(&self, dir: &Path, pattern: &str) -> FirmSealResult<BatchVerifyReport> {
        let inputs = collect_inputs(dir, pattern)?;
        Ok(self.verify_batch(&inputs))
    }
}
