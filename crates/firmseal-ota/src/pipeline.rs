//! Staged package assembly.
//!
//! The manifest carries its own checksum and sits inside the archive whose
//! checksum it also carries. Each stage is a separate type and can only be
//! reached from the one before it:
//!
//! 1. [`CompressedPayloads`]: payloads compressed, sizes and offsets known
//! 2. [`DraftManifest`]: manifest serialized with both checksums blank
//! 3. [`HashedManifest`]: `manifest_checksum` = digest of the draft bytes
//! 4. [`StagedArchive`]: tar of that manifest and the payloads
//! 5. [`FinalizedArchive`]: `package_checksum` = digest of the staged tar,
//!    manifest rewritten and the archive rebuilt around it
//! 6. [`SealedPackage`]: optionally encrypted, then optionally signed
//!
//! Every transition appends a [`BuildStage`] to the trace.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use firmseal_errors::FirmSealResult;
use firmseal_signing::FirmwareSigner;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::archive;
use crate::encryption::{self, CipherMode, EncryptionAlgorithm, EncryptionKey};
use crate::manifest::{
    EncryptionInfo, FREE_SPACE_FACTOR, FileEntry, MANIFEST_ENTRY, OtaManifest, PackageSignature,
};

/// One step of a completed build, in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum BuildStage {
    /// Payloads compressed and laid out
    Compressed {
        /// Number of payloads
        files: usize,
        /// Sum of uncompressed sizes
        total_size: u64,
        /// Sum of compressed sizes
        compressed_size: u64,
    },
    /// Manifest serialized with blank checksums
    ManifestDrafted {
        /// Length of the draft JSON
        manifest_size: u64,
    },
    /// Manifest checksum embedded
    ManifestHashed {
        /// Hex digest of the draft
        manifest_checksum: String,
    },
    /// First archive written
    Archived {
        /// Archive length
        archive_size: u64,
    },
    /// Package checksum embedded and the archive rebuilt
    PackageHashed {
        /// Hex digest of the first archive
        package_checksum: String,
        /// Length of the rebuilt archive
        archive_size: u64,
    },
    /// Archive encrypted
    Encrypted {
        /// Key size
        algorithm: EncryptionAlgorithm,
        /// Cipher mode
        mode: CipherMode,
        /// Encrypted length
        package_size: u64,
    },
    /// Final bytes signed
    Signed {
        /// Fingerprint of the signing key
        fingerprint: String,
    },
}

impl BuildStage {
    /// Short snake_case stage name.
    pub fn name(&self) -> &'static str {
        match self {
            BuildStage::Compressed { .. } => "compressed",
            BuildStage::ManifestDrafted { .. } => "manifest_drafted",
            BuildStage::ManifestHashed { .. } => "manifest_hashed",
            BuildStage::Archived { .. } => "archived",
            BuildStage::PackageHashed { .. } => "package_hashed",
            BuildStage::Encrypted { .. } => "encrypted",
            BuildStage::Signed { .. } => "signed",
        }
    }
}

/// A compressed payload and its manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Manifest entry; `compressed_size` and `offset` are filled in by
    /// [`CompressedPayloads::new`]
    pub entry: FileEntry,
    /// Compressed bytes
    pub data: Vec<u8>,
}

/// Archive layout shared by the builder and the verifier: the manifest
/// first, then each payload under its `.compressed` name.
pub(crate) fn package_archive(manifest_json: &[u8], payloads: &[Payload]) -> FirmSealResult<Vec<u8>> {
    let names: Vec<String> = payloads.iter().map(|p| p.entry.archive_name()).collect();
    let entries = std::iter::once((MANIFEST_ENTRY, manifest_json)).chain(
        names
            .iter()
            .map(String::as_str)
            .zip(payloads.iter().map(|p| p.data.as_slice())),
    );
    archive::write_archive(entries)
}

/// Stage 1: payloads compressed and laid out.
#[derive(Debug)]
pub struct CompressedPayloads {
    manifest: OtaManifest,
    payloads: Vec<Payload>,
    trace: Vec<BuildStage>,
}

impl CompressedPayloads {
    /// Record sizes and running offsets, and size the free-space
    /// requirement. Any files or checksums already in `manifest` are
    /// replaced.
    pub fn new(mut manifest: OtaManifest, mut payloads: Vec<Payload>) -> Self {
        let mut offset = 0u64;
        for payload in &mut payloads {
            let compressed_size = payload.data.len() as u64;
            payload.entry.compressed_size = compressed_size;
            payload.entry.offset = offset;
            offset = offset.saturating_add(compressed_size);
        }

        manifest.files = payloads.iter().map(|p| p.entry.clone()).collect();
        manifest.checksums.package_checksum.clear();
        manifest.checksums.manifest_checksum.clear();
        manifest.encryption = None;
        manifest.signature = None;
        let total_size = manifest.total_size();
        manifest.pre_install.required_free_space = total_size.saturating_mul(FREE_SPACE_FACTOR);

        let stage = BuildStage::Compressed {
            files: payloads.len(),
            total_size,
            compressed_size: offset,
        };
        debug!(files = payloads.len(), total_size, compressed_size = offset, "Payloads laid out");

        Self {
            manifest,
            payloads,
            trace: vec![stage],
        }
    }

    /// Manifest as laid out so far.
    pub fn manifest(&self) -> &OtaManifest {
        &self.manifest
    }

    /// Serialize the manifest with blank checksums.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the manifest cannot be encoded.
    pub fn draft(mut self) -> FirmSealResult<DraftManifest> {
        let bytes = self.manifest.to_json_bytes()?;
        self.trace.push(BuildStage::ManifestDrafted {
            manifest_size: bytes.len() as u64,
        });
        debug!(manifest_size = bytes.len(), "Manifest drafted");
        Ok(DraftManifest {
            manifest: self.manifest,
            payloads: self.payloads,
            bytes,
            trace: self.trace,
        })
    }
}

/// Stage 2: manifest serialized with both checksums blank.
#[derive(Debug)]
pub struct DraftManifest {
    manifest: OtaManifest,
    payloads: Vec<Payload>,
    bytes: Vec<u8>,
    trace: Vec<BuildStage>,
}

impl DraftManifest {
    /// Draft JSON bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Embed the digest of the draft as `manifest_checksum`.
    pub fn hash(mut self) -> HashedManifest {
        let checksum = self.manifest.checksums.algorithm.hex_digest(&self.bytes);
        self.manifest.checksums.manifest_checksum.clone_from(&checksum);
        debug!(manifest_checksum = %checksum, "Manifest checksum embedded");
        self.trace.push(BuildStage::ManifestHashed {
            manifest_checksum: checksum,
        });
        HashedManifest {
            manifest: self.manifest,
            payloads: self.payloads,
            trace: self.trace,
        }
    }
}

/// Stage 3: `manifest_checksum` embedded.
#[derive(Debug)]
pub struct HashedManifest {
    manifest: OtaManifest,
    payloads: Vec<Payload>,
    trace: Vec<BuildStage>,
}

impl HashedManifest {
    /// Manifest with its own checksum.
    pub fn manifest(&self) -> &OtaManifest {
        &self.manifest
    }

    /// Write the first archive around the manifest and payloads.
    ///
    /// # Errors
    ///
    /// Returns a serialization or archive error.
    pub fn archive(mut self) -> FirmSealResult<StagedArchive> {
        let bytes = package_archive(&self.manifest.to_json_bytes()?, &self.payloads)?;
        self.trace.push(BuildStage::Archived {
            archive_size: bytes.len() as u64,
        });
        debug!(archive_size = bytes.len(), "Staged archive written");
        Ok(StagedArchive {
            manifest: self.manifest,
            payloads: self.payloads,
            bytes,
            trace: self.trace,
        })
    }
}

/// Stage 4: archive containing the manifest with a blank package checksum.
#[derive(Debug)]
pub struct StagedArchive {
    manifest: OtaManifest,
    payloads: Vec<Payload>,
    bytes: Vec<u8>,
    trace: Vec<BuildStage>,
}

impl StagedArchive {
    /// Archive bytes covered by `package_checksum`.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Embed the digest of this archive as `package_checksum` and rebuild
    /// the archive around the updated manifest.
    ///
    /// # Errors
    ///
    /// Returns a serialization or archive error.
    pub fn finalize(mut self) -> FirmSealResult<FinalizedArchive> {
        let checksum = self.manifest.checksums.algorithm.hex_digest(&self.bytes);
        self.manifest.checksums.package_checksum.clone_from(&checksum);
        let bytes = package_archive(&self.manifest.to_json_bytes()?, &self.payloads)?;
        debug!(package_checksum = %checksum, archive_size = bytes.len(), "Package checksum embedded");
        self.trace.push(BuildStage::PackageHashed {
            package_checksum: checksum,
            archive_size: bytes.len() as u64,
        });
        Ok(FinalizedArchive {
            manifest: self.manifest,
            bytes,
            trace: self.trace,
        })
    }
}

/// Stage 5: final archive with both checksums embedded.
#[derive(Debug)]
pub struct FinalizedArchive {
    manifest: OtaManifest,
    bytes: Vec<u8>,
    trace: Vec<BuildStage>,
}

impl FinalizedArchive {
    /// Final archive bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encrypt and sign the archive as requested.
    ///
    /// Encryption runs first so the signature covers the bytes that ship.
    ///
    /// # Errors
    ///
    /// Returns an encryption or signature error.
    pub fn seal(
        self,
        encryption: Option<(&EncryptionKey, CipherMode)>,
        signer: Option<&FirmwareSigner>,
    ) -> FirmSealResult<SealedPackage> {
        let Self {
            mut manifest,
            mut bytes,
            mut trace,
        } = self;

        if let Some((key, mode)) = encryption {
            let sealed = encryption::encrypt(&bytes, key, mode)?;
            bytes = sealed.bytes;
            manifest.encryption = Some(EncryptionInfo {
                enabled: true,
                algorithm: key.algorithm(),
                mode,
                iv: hex::encode(sealed.iv),
            });
            debug!(algorithm = %key.algorithm(), %mode, package_size = bytes.len(), "Package encrypted");
            trace.push(BuildStage::Encrypted {
                algorithm: key.algorithm(),
                mode,
                package_size: bytes.len() as u64,
            });
        }

        if let Some(signer) = signer {
            let signature = signer.sign_data(&bytes)?;
            let fingerprint = signer.fingerprint()?;
            manifest.signature = Some(PackageSignature {
                algorithm: signer.signature_algorithm(),
                hash_algorithm: signer.hash_algorithm(),
                signature: BASE64.encode(signature),
                fingerprint: fingerprint.clone(),
                signing_date: chrono::Utc::now().to_rfc3339(),
            });
            debug!(fingerprint = %fingerprint, "Package signed");
            trace.push(BuildStage::Signed { fingerprint });
        }

        Ok(SealedPackage {
            manifest,
            bytes,
            trace,
        })
    }
}

/// Stage 6: bytes ready to ship and the authoritative manifest.
#[derive(Debug, Clone)]
pub struct SealedPackage {
    /// Final manifest, including encryption and signature details
    pub manifest: OtaManifest,
    /// Package bytes
    pub bytes: Vec<u8>,
    /// Stages run to produce this package
    pub trace: Vec<BuildStage>,
}
