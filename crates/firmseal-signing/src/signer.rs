//! Firmware signer.

use std::path::{Path, PathBuf};

use firmseal_errors::{FirmSealResult, FormatError, IoResultExt, KeyError};
use firmseal_header::{FirmwareHeader, FirmwareVersion, HashAlgorithm, SignatureAlgorithm};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use tracing::{debug, error, info};

use crate::batch::{collect_inputs, signed_output_path};
use crate::config::SignerConfig;
use crate::image::SignedFirmwareImage;
use crate::report::{BatchEntry, BatchFailure, BatchSignReport, SignReport};
use crate::{keys, pss};

/// Hashes, CRCs, and RSA-PSS signs firmware blobs.
///
/// The digest is fixed by [`SignerConfig`] and the signature algorithm
/// follows the key's modulus size.
pub struct FirmwareSigner {
    private_key: RsaPrivateKey,
    hash_algorithm: HashAlgorithm,
    signature_algorithm: SignatureAlgorithm,
}

impl std::fmt::Debug for FirmwareSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirmwareSigner")
            .field("hash_algorithm", &self.hash_algorithm)
            .field("signature_algorithm", &self.signature_algorithm)
            .finish_non_exhaustive()
    }
}

impl FirmwareSigner {
    /// Load a PEM private key and build a signer.
    ///
    /// # Errors
    ///
    /// Returns a [`KeyError`] if the key is unreadable, not RSA, of an
    /// unsupported size, or a different size than `config` requires.
    pub fn from_key_file(path: impl AsRef<Path>, config: SignerConfig) -> FirmSealResult<Self> {
        let private_key = keys::load_private_key(path.as_ref())?;
        Self::from_private_key(private_key, config)
    }

    /// Build a signer around an already loaded key.
    ///
    /// # Errors
    ///
    /// See [`FirmwareSigner::from_key_file`].
    pub fn from_private_key(private_key: RsaPrivateKey, config: SignerConfig) -> FirmSealResult<Self> {
        let bits = private_key.n().bits();
        let signature_algorithm =
            SignatureAlgorithm::from_key_bits(bits).ok_or(KeyError::UnsupportedKeySize { bits })?;

        if let Some(expected) = config.key_size
            && expected != signature_algorithm.key_bits()
        {
            return Err(KeyError::SizeMismatch {
                expected,
                actual: bits,
            }
            .into());
        }

        debug!(
            hash = %config.hash_algorithm,
            signature = %signature_algorithm,
            "Firmware signer ready"
        );

        Ok(Self {
            private_key,
            hash_algorithm: config.hash_algorithm,
            signature_algorithm,
        })
    }

    /// Digest selected at construction.
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    /// Signature algorithm implied by the key.
    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        self.signature_algorithm
    }

    /// Public half of the signing key.
    pub fn public_key(&self) -> RsaPublicKey {
        self.private_key.to_public_key()
    }

    /// Lowercase hex SHA-256 of the public key's SPKI encoding.
    ///
    /// # Errors
    ///
    /// Returns a [`KeyError`] if the key cannot be encoded.
    pub fn fingerprint(&self) -> FirmSealResult<String> {
        keys::public_key_fingerprint(&self.public_key())
    }

    /// Digest of `data` with the configured algorithm.
    pub fn compute_hash(&self, data: &[u8]) -> Vec<u8> {
        self.hash_algorithm.digest(data)
    }

    /// CRC32 (IEEE) of `data`.
    pub fn compute_crc32(&self, data: &[u8]) -> u32 {
        crc32fast::hash(data)
    }

    /// RSA-PSS signature over `data`.
    ///
    /// # Errors
    ///
    /// Returns a signature error if the private-key operation fails.
    pub fn sign_data(&self, data: &[u8]) -> FirmSealResult<Vec<u8>> {
        Ok(pss::sign(&self.private_key, self.hash_algorithm, data)?)
    }

    /// Sign `firmware` as `version`, stamped with the current time.
    ///
    /// # Errors
    ///
    /// See [`FirmwareSigner::sign_firmware_at`].
    pub fn sign_firmware(
        &self,
        firmware: &[u8],
        version: FirmwareVersion,
    ) -> FirmSealResult<SignedFirmwareImage> {
        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
        self.sign_firmware_at(firmware, version, now)
    }

    /// Sign `firmware` as `version` with an explicit unix timestamp.
    ///
    /// The signature covers the raw firmware bytes, not the header.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::EmptyFirmware`] for empty input,
    /// [`FormatError::FieldOverflow`] if the firmware does not fit a `u32`
    /// length, or a signature error.
    pub fn sign_firmware_at(
        &self,
        firmware: &[u8],
        version: FirmwareVersion,
        timestamp: u64,
    ) -> FirmSealResult<SignedFirmwareImage> {
        if firmware.is_empty() {
            return Err(FormatError::EmptyFirmware.into());
        }

        let mut header = FirmwareHeader::new(version);
        header.timestamp = timestamp;
        header.set_firmware_size(firmware.len())?;
        header.hash_algorithm_id = self.hash_algorithm.id();
        header.signature_algorithm_id = self.signature_algorithm.id();
        header.set_digest(&self.compute_hash(firmware))?;
        header.crc32 = self.compute_crc32(firmware);

        let signature = self.sign_data(firmware)?;
        header.set_signature_size(signature.len())?;

        debug!(
            firmware_size = firmware.len(),
            signature_size = signature.len(),
            crc32 = header.crc32,
            "Firmware signed"
        );

        Ok(SignedFirmwareImage::assemble(header, firmware, &signature))
    }

    /// Sign the file at `input` and write the image to `output`.
    ///
    /// # Errors
    ///
    /// Returns a not-found I/O error if `input` is missing, plus any error
    /// from [`FirmwareSigner::sign_firmware`].
    pub fn sign_file(
        &self,
        input: &Path,
        output: &Path,
        version: FirmwareVersion,
    ) -> FirmSealResult<SignReport> {
        let firmware = std::fs::read(input).with_path(input)?;
        let image = self.sign_firmware(&firmware, version)?;
        image.write_to(output)?;

        let header = image.header();
        let summary = header.summary();
        info!(
            input = %input.display(),
            output = %output.display(),
            size = image.len(),
            "Signed firmware written"
        );

        Ok(SignReport {
            input_file: input.to_path_buf(),
            output_file: output.to_path_buf(),
            version: version.to_string(),
            firmware_size: firmware.len() as u64,
            signed_size: image.len() as u64,
            hash_algorithm: self.hash_algorithm.name().to_string(),
            signature_algorithm: self.signature_algorithm.name().to_string(),
            hash: summary.hash,
            crc32: summary.crc32,
            signature_size: u64::from(header.signature_size),
            timestamp: summary.timestamp_iso.unwrap_or_default(),
        })
    }

    /// Sign every input into `output_dir` as `<stem>_signed<.ext>`.
    ///
    /// A failing input is recorded in its own entry and the remaining
    /// inputs are still processed.
    pub fn sign_batch(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        version: FirmwareVersion,
    ) -> BatchSignReport {
        let results = inputs
            .iter()
            .map(|input| {
                let outcome = signed_output_path(input, output_dir)
                    .and_then(|output| self.sign_file(input, &output, version));
                match outcome {
                    Ok(report) => BatchEntry::Completed(report),
                    Err(e) => {
                        error!(input = %input.display(), error = %e, "Batch signing failed");
                        BatchEntry::Failed(BatchFailure::new(input, &e))
                    }
                }
            })
            .collect();

        let report = BatchSignReport::from_entries(results);
        info!(
            total = report.summary.total,
            passed = report.summary.passed,
            failed = report.summary.failed,
            "Batch signing complete"
        );
        report
    }

    /// Sign every file in `input_dir` matching `pattern`.
    ///
    /// # Errors
    ///
    /// Fails only if the pattern is invalid or the directory cannot be
    /// listed; per-file failures land in the report.
    pub fn sign_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        pattern: &str,
        version: FirmwareVersion,
    ) -> FirmSealResult<BatchSignReport> {
        let inputs = collect_inputs(input_dir, pattern)?;
        Ok(self.sign_batch(&inputs, output_dir, version))
    }
}
