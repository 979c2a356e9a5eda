//! OTA package verification.
//!
//! [`PackageVerifier`] re-derives everything the builder recorded: the
//! signature over the shipped bytes, the decrypted archive, both staged
//! checksums, and each payload's size and digest. Checks keep running after
//! one fails so the report shows every failing facet.

use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use firmseal_errors::{FirmSealResult, IoResultExt};
use firmseal_signing::{keys, pss};
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::archive::{self, ArchiveEntry};
use crate::compression::decompress_limited;
use crate::encryption::{self, EncryptionKey, IV_LEN};
use crate::manifest::{FileEntry, MANIFEST_ENTRY, OtaManifest, sibling_manifest_path};

/// Result of checking one payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCheck {
    /// Payload name from the manifest
    pub name: String,
    /// The archive holds `<name>.compressed`
    pub present: bool,
    /// Compressed and decompressed lengths match the manifest
    pub size_valid: bool,
    /// Decompressed digest matches the manifest
    pub checksum_valid: bool,
}

impl FileCheck {
    fn missing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            present: false,
            size_valid: false,
            checksum_valid: false,
        }
    }

    /// Every check passed.
    pub fn is_valid(&self) -> bool {
        self.present && self.size_valid && self.checksum_valid
    }
}

/// Outcome of verifying one package against its manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageVerificationReport {
    /// Package file, when verified from disk
    pub package: Option<PathBuf>,
    /// Package length as shipped
    pub package_size: u64,
    /// `None` when no public key was supplied
    pub signature_valid: Option<bool>,
    /// `None` when the package is not encrypted
    pub decrypted: Option<bool>,
    /// Archive holds the manifest then each payload in order, in canonical form
    pub archive_valid: bool,
    /// Embedded manifest is byte-identical to the supplied one minus sealing details
    pub manifest_matches: bool,
    /// `manifest_checksum` reproduces
    pub manifest_checksum_valid: bool,
    /// `package_checksum` reproduces
    pub package_checksum_valid: bool,
    /// Payload offsets are contiguous
    pub offsets_valid: bool,
    /// Per-payload results in manifest order
    pub files: Vec<FileCheck>,
    /// Everything above passed and the signature was not rejected
    pub overall_valid: bool,
    /// RFC 3339 verification time
    pub verified_at: String,
}

impl PackageVerificationReport {
    /// 0 when the package is valid, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.overall_valid)
    }
}

/// Checks OTA packages against their sibling manifests.
///
/// An encrypted package needs a decryption key before any archive check
/// can run; without one the report is invalid.
#[derive(Clone, Default)]
pub struct PackageVerifier {
    public_key: Option<RsaPublicKey>,
    decryption_key: Option<Zeroizing<String>>,
}

impl std::fmt::Debug for PackageVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageVerifier")
            .field("public_key", &self.public_key.is_some())
            .field("decryption_key", &self.decryption_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl PackageVerifier {
    /// Verifier that checks neither signatures nor encrypted packages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check signatures with `public_key`.
    pub fn with_public_key(mut self, public_key: RsaPublicKey) -> Self {
        self.public_key = Some(public_key);
        self
    }

    /// Check signatures with the PEM public key at `path`.
    ///
    /// # Errors
    ///
    /// Returns a key error if the file is unreadable or not an RSA key.
    pub fn with_public_key_file(self, path: impl AsRef<Path>) -> FirmSealResult<Self> {
        Ok(self.with_public_key(keys::load_public_key(path.as_ref())?))
    }

    /// Decrypt with this hex key or passphrase. The key size comes from the
    /// manifest being verified.
    pub fn with_decryption_key(mut self, material: impl Into<String>) -> Self {
        self.decryption_key = Some(Zeroizing::new(material.into()));
        self
    }

    /// Verify `package` against `manifest`.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the manifest cannot be encoded for
    /// rehashing. Every other failure is recorded in the report.
    pub fn verify(
        &self,
        package: &[u8],
        manifest: &OtaManifest,
    ) -> FirmSealResult<PackageVerificationReport> {
        let signature_valid = self.check_signature(package, manifest);

        let (decrypted, archive_bytes) = match &manifest.encryption {
            Some(info) if info.enabled => match self.decrypt(package, manifest) {
                Some(bytes) => (Some(true), Some(bytes)),
                None => (Some(false), None),
            },
            _ => (None, Some(package.to_vec())),
        };

        let algorithm = manifest.checksums.algorithm;
        let draft = manifest.checksum_draft().to_json_bytes()?;
        let manifest_checksum_valid =
            hex_matches(&algorithm.hex_digest(&draft), &manifest.checksums.manifest_checksum);
        let offsets_valid = manifest.offsets_are_contiguous();

        let mut archive_valid = false;
        let mut manifest_matches = false;
        let mut package_checksum_valid = false;
        let mut files: Vec<FileCheck> =
            manifest.files.iter().map(|f| FileCheck::missing(&f.name)).collect();

        if let Some(bytes) = archive_bytes {
            match archive::read_archive(&bytes) {
                Ok(entries) => {
                    archive_valid = layout_matches(&entries, manifest)
                        && archive::write_archive(entry_pairs(&entries))? == bytes;

                    let packaged_json = manifest.packaged().to_json_bytes()?;
                    manifest_matches = entries
                        .first()
                        .is_some_and(|e| e.name == MANIFEST_ENTRY && e.data == packaged_json);

                    let staged_json = manifest.staged().to_json_bytes()?;
                    let staged = archive::write_archive(
                        std::iter::once((MANIFEST_ENTRY, staged_json.as_slice()))
                            .chain(entry_pairs(entries.iter().skip(1))),
                    );
                    package_checksum_valid = staged.is_ok_and(|staged| {
                        hex_matches(
                            &algorithm.hex_digest(&staged),
                            &manifest.checksums.package_checksum,
                        )
                    });

                    files = manifest
                        .files
                        .iter()
                        .map(|file| check_file(file, &entries, manifest))
                        .collect();
                }
                Err(e) => warn!(error = %e, "Package is not a readable archive"),
            }
        }

        let overall_valid = signature_valid != Some(false)
            && decrypted != Some(false)
            && archive_valid
            && manifest_matches
            && manifest_checksum_valid
            && package_checksum_valid
            && offsets_valid
            && files.iter().all(FileCheck::is_valid);

        let report = PackageVerificationReport {
            package: None,
            package_size: package.len() as u64,
            signature_valid,
            decrypted,
            archive_valid,
            manifest_matches,
            manifest_checksum_valid,
            package_checksum_valid,
            offsets_valid,
            files,
            overall_valid,
            verified_at: chrono::Utc::now().to_rfc3339(),
        };
        if overall_valid {
            info!(package_size = report.package_size, "OTA package verified");
        } else {
            warn!(
                signature = ?report.signature_valid,
                decrypted = ?report.decrypted,
                archive = report.archive_valid,
                manifest = report.manifest_matches,
                manifest_checksum = report.manifest_checksum_valid,
                package_checksum = report.package_checksum_valid,
                "OTA package failed verification"
            );
        }
        Ok(report)
    }

    /// Verify a package file against its sibling manifest.
    ///
    /// # Errors
    ///
    /// Fails if either file cannot be read or the manifest cannot be parsed.
    pub fn verify_file(&self, package: impl AsRef<Path>) -> FirmSealResult<PackageVerificationReport> {
        let package = package.as_ref();
        let bytes = std::fs::read(package).with_path(package)?;
        let manifest = OtaManifest::read_from(sibling_manifest_path(package))?;
        let mut report = self.verify(&bytes, &manifest)?;
        report.package = Some(package.to_path_buf());
        Ok(report)
    }

    fn check_signature(&self, package: &[u8], manifest: &OtaManifest) -> Option<bool> {
        let public_key = self.public_key.as_ref()?;
        let Some(signature) = &manifest.signature else {
            warn!("Package is unsigned but a public key was supplied");
            return Some(false);
        };

        match keys::public_key_fingerprint(public_key) {
            Ok(fingerprint) if fingerprint == signature.fingerprint => {}
            Ok(fingerprint) => {
                warn!(
                    expected = %signature.fingerprint,
                    actual = %fingerprint,
                    "Package was signed by a different key"
                );
                return Some(false);
            }
            Err(e) => {
                warn!(error = %e, "Could not fingerprint the public key");
                return Some(false);
            }
        }

        let Ok(raw) = BASE64.decode(&signature.signature) else {
            warn!("Package signature is not valid base64");
            return Some(false);
        };
        match pss::verify(public_key, signature.hash_algorithm, package, &raw) {
            Ok(()) => Some(true),
            Err(e) => {
                debug!(error = %e, "Package signature rejected");
                Some(false)
            }
        }
    }

    fn decrypt(&self, package: &[u8], manifest: &OtaManifest) -> Option<Vec<u8>> {
        let info = manifest.encryption.as_ref()?;
        let Some(material) = &self.decryption_key else {
            warn!("Package is encrypted and no decryption key was supplied");
            return None;
        };

        let recorded_iv = package.get(..IV_LEN).map(hex::encode);
        if recorded_iv.as_deref() != Some(info.iv.as_str()) {
            warn!(manifest_iv = %info.iv, "Package IV does not match the manifest");
            return None;
        }

        let key = match EncryptionKey::from_material(material, info.algorithm) {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "Decryption key is unusable");
                return None;
            }
        };
        match encryption::decrypt(package, &key, info.mode) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(error = %e, "Package decryption failed");
                None
            }
        }
    }
}

fn hex_matches(computed: &str, recorded: &str) -> bool {
    bool::from(computed.as_bytes().ct_eq(recorded.as_bytes()))
}

fn entry_pairs<'a>(
    entries: impl IntoIterator<Item = &'a ArchiveEntry>,
) -> impl Iterator<Item = (&'a str, &'a [u8])> {
    entries
        .into_iter()
        .map(|e| (e.name.as_str(), e.data.as_slice()))
}

fn layout_matches(entries: &[ArchiveEntry], manifest: &OtaManifest) -> bool {
    let expected = std::iter::once(MANIFEST_ENTRY.to_string())
        .chain(manifest.files.iter().map(FileEntry::archive_name));
    entries.iter().map(|e| e.name.clone()).eq(expected)
}

fn check_file(file: &FileEntry, entries: &[ArchiveEntry], manifest: &OtaManifest) -> FileCheck {
    let archive_name = file.archive_name();
    let Some(entry) = entries.iter().skip(1).find(|e| e.name == archive_name) else {
        warn!(name = %file.name, "Payload missing from archive");
        return FileCheck::missing(&file.name);
    };

    let mut check = FileCheck {
        name: file.name.clone(),
        present: true,
        size_valid: false,
        checksum_valid: false,
    };
    if entry.data.len() as u64 != file.compressed_size {
        warn!(
            name = %file.name,
            expected = file.compressed_size,
            actual = entry.data.len(),
            "Compressed size mismatch"
        );
        return check;
    }

    match decompress_limited(&entry.data, file.compression, file.size) {
        Ok(data) => {
            check.size_valid = data.len() as u64 == file.size;
            let digest = manifest.checksums.algorithm.hex_digest(&data);
            check.checksum_valid = hex_matches(&digest, &file.checksum);
            if !check.checksum_valid {
                warn!(name = %file.name, "Payload checksum mismatch");
            }
        }
        Err(e) => warn!(name = %file.name, error = %e, "Payload did not decompress"),
    }
    check
}
