//! OTA package builder.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use firmseal_errors::{
    FirmSealError, FirmSealResult, FormatError, IntegrityError, IoResultExt, KeyError,
};
use firmseal_header::FirmwareVersion;
use firmseal_signing::{FirmwareSigner, SignerConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::compression::{CompressionType, compress};
use crate::config::{BuildOptions, OtaBuilderConfig};
use crate::encryption::EncryptionKey;
use crate::manifest::{
    AbUpdate, FileEntry, FileType, OtaManifest, PackageType, PostInstall, RollbackProtection,
    TargetDevice, TargetSlot, sibling_manifest_path,
};
use crate::pipeline::{BuildStage, CompressedPayloads, Payload};

/// Partition recorded when `add_file` is given none.
pub const DEFAULT_PARTITION: &str = "default";

#[derive(Debug, Clone)]
struct PendingFile {
    source: PathBuf,
    entry: FileEntry,
}

/// Where a build wrote its results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildOutput {
    /// Package file
    pub package_path: PathBuf,
    /// Sibling manifest file
    pub manifest_path: PathBuf,
    /// Package length in bytes
    pub package_size: u64,
    /// Manifest as written to `manifest_path`
    pub manifest: OtaManifest,
    /// Pipeline stages in the order they ran
    pub stages: Vec<BuildStage>,
}

/// Collects payloads and metadata, then assembles OTA packages.
///
/// `add_file` hashes each source immediately so a missing file fails
/// before any compression work. Each [`build`](Self::build) is independent
/// and leaves the builder unchanged.
#[derive(Debug, Clone)]
pub struct OtaManifestBuilder {
    config: OtaBuilderConfig,
    manifest: OtaManifest,
    pending: Vec<PendingFile>,
}

impl Default for OtaManifestBuilder {
    fn default() -> Self {
        Self::new(OtaBuilderConfig::default())
    }
}

impl OtaManifestBuilder {
    /// Builder with default manifest metadata.
    pub fn new(config: OtaBuilderConfig) -> Self {
        let mut manifest = OtaManifest::default();
        manifest.format_version.clone_from(&config.manifest_version);
        manifest.checksums.algorithm = config.checksum_algorithm;
        Self {
            config,
            manifest,
            pending: Vec::new(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &OtaBuilderConfig {
        &self.config
    }

    /// Manifest metadata set so far. Files appear once a build lays them out.
    pub fn manifest(&self) -> &OtaManifest {
        &self.manifest
    }

    /// Entries added so far, in add order.
    pub fn files(&self) -> impl Iterator<Item = &FileEntry> {
        self.pending.iter().map(|p| &p.entry)
    }

    /// Set the firmware version.
    pub fn set_version(&mut self, version: FirmwareVersion) -> &mut Self {
        debug!(%version, "Firmware version set");
        self.manifest.firmware_version = version.into();
        self
    }

    /// Set the target device.
    pub fn set_target_device(
        &mut self,
        model: impl Into<String>,
        hardware_version: impl Into<String>,
    ) -> &mut Self {
        self.manifest.target_device = TargetDevice {
            model: model.into(),
            hardware_version: hardware_version.into(),
        };
        self
    }

    /// Set the package type.
    pub fn set_package_type(&mut self, package_type: PackageType) -> &mut Self {
        self.manifest.package_type = package_type;
        self
    }

    /// Configure A/B installation.
    pub fn set_ab_update(&mut self, enabled: bool, target_slot: TargetSlot) -> &mut Self {
        self.manifest.ab_update = AbUpdate {
            enabled,
            target_slot,
            ..self.manifest.ab_update
        };
        self
    }

    /// Configure rollback protection. Without a minimum version the
    /// current firmware version is used.
    pub fn set_rollback_protection(
        &mut self,
        enabled: bool,
        minimum_version: Option<FirmwareVersion>,
        security_patch_level: u32,
    ) -> &mut Self {
        let minimum_version = minimum_version.map_or_else(
            || self.manifest.firmware_version.version_string.clone(),
            |v| v.to_string(),
        );
        self.manifest.rollback_protection = RollbackProtection {
            enabled,
            minimum_version,
            security_patch_level,
        };
        self
    }

    /// Configure post-install behavior.
    pub fn set_post_install(&mut self, reboot_required: bool, verification_timeout: u32) -> &mut Self {
        self.manifest.post_install = PostInstall {
            reboot_required,
            verification_timeout,
        };
        self
    }

    /// Replace the metadata fields that are given.
    pub fn set_metadata(
        &mut self,
        description: Option<&str>,
        author: Option<&str>,
        changelog: Option<Vec<String>>,
        tags: Option<Vec<String>>,
    ) -> &mut Self {
        let metadata = &mut self.manifest.metadata;
        if let Some(description) = description {
            metadata.description = description.to_string();
        }
        if let Some(author) = author {
            metadata.author = author.to_string();
        }
        if let Some(changelog) = changelog {
            metadata.changelog = changelog;
        }
        if let Some(tags) = tags {
            metadata.tags = tags;
        }
        self
    }

    /// Add a payload.
    ///
    /// The size and checksum are taken now. `target_path` defaults to the
    /// source path, `partition` to `"default"`, and `compression` to the
    /// configured default.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or a manifest
    /// error if a payload with the same file name was already added.
    pub fn add_file(
        &mut self,
        path: impl AsRef<Path>,
        file_type: FileType,
        target_path: Option<&str>,
        partition: Option<&str>,
        compression: Option<CompressionType>,
    ) -> FirmSealResult<FileEntry> {
        let path = path.as_ref();
        let data = std::fs::read(path).with_path(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| FormatError::Manifest(format!("{} has no file name", path.display())))?;
        if self.pending.iter().any(|p| p.entry.name == name) {
            return Err(FormatError::Manifest(format!("duplicate payload name '{name}'")).into());
        }

        let entry = FileEntry {
            path: target_path.map_or_else(|| path.to_string_lossy().into_owned(), str::to_string),
            size: data.len() as u64,
            checksum: self.config.checksum_algorithm.hex_digest(&data),
            file_type,
            compression: compression.unwrap_or(self.config.default_compression),
            partition: partition.unwrap_or(DEFAULT_PARTITION).to_string(),
            compressed_size: 0,
            offset: 0,
            name,
        };
        info!(
            name = %entry.name,
            file_type = %entry.file_type,
            size = entry.size,
            "Added file"
        );
        self.pending.push(PendingFile {
            source: path.to_path_buf(),
            entry: entry.clone(),
        });
        Ok(entry)
    }

    /// Assemble the package at `output` and its manifest next to it.
    ///
    /// Keys are checked and loaded before any compression starts. The
    /// package is written to a temporary file in the output directory and
    /// renamed into place once complete.
    ///
    /// # Errors
    ///
    /// Fails if no files were added, a requested key is missing or
    /// unusable, a source changed since it was added, or any I/O, codec,
    /// cipher, or signing step fails.
    pub fn build(&self, output: impl AsRef<Path>, options: &BuildOptions) -> FirmSealResult<BuildOutput> {
        let output = output.as_ref();
        if self.pending.is_empty() {
            return Err(FormatError::Manifest("no files added to package".to_string()).into());
        }

        let encryption_key = if options.encrypt {
            let material = options
                .encryption_key
                .as_deref()
                .filter(|m| !m.trim().is_empty())
                .ok_or(KeyError::Missing {
                    purpose: "package encryption",
                })?;
            Some(EncryptionKey::from_material(
                material,
                self.config.encryption_algorithm,
            )?)
        } else {
            None
        };

        let signer = if options.sign {
            let key_path = options
                .private_key_path
                .as_deref()
                .ok_or(KeyError::Missing {
                    purpose: "package signing",
                })?;
            Some(FirmwareSigner::from_key_file(
                key_path,
                SignerConfig::with_hash(self.config.signature_hash_algorithm),
            )?)
        } else {
            None
        };

        info!(
            files = self.pending.len(),
            output = %output.display(),
            encrypt = options.encrypt,
            sign = options.sign,
            "Building OTA package"
        );

        let payloads = self
            .pending
            .iter()
            .map(|p| self.compress_pending(p))
            .collect::<FirmSealResult<Vec<_>>>()?;

        let mut manifest = self.manifest.clone();
        manifest.build_date = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

        let sealed = CompressedPayloads::new(manifest, payloads)
            .draft()?
            .hash()
            .archive()?
            .finalize()?
            .seal(
                encryption_key.as_ref().map(|k| (k, self.config.cipher_mode)),
                signer.as_ref(),
            )?;

        write_atomically(output, &sealed.bytes)?;
        let manifest_path = sibling_manifest_path(output);
        write_atomically(&manifest_path, &sealed.manifest.to_json_bytes()?)?;

        let package_size = sealed.bytes.len() as u64;
        info!(
            package = %output.display(),
            manifest = %manifest_path.display(),
            package_size,
            package_checksum = %sealed.manifest.checksums.package_checksum,
            "OTA package built"
        );

        Ok(BuildOutput {
            package_path: output.to_path_buf(),
            manifest_path,
            package_size,
            manifest: sealed.manifest,
            stages: sealed.trace,
        })
    }

    fn compress_pending(&self, pending: &PendingFile) -> FirmSealResult<Payload> {
        let data = std::fs::read(&pending.source).with_path(&pending.source)?;
        let checksum = self.config.checksum_algorithm.hex_digest(&data);
        if checksum != pending.entry.checksum {
            return Err(IntegrityError::checksum(
                pending.entry.name.clone(),
                pending.entry.checksum.clone(),
                checksum,
            )
            .into());
        }

        let compressed = compress(&data, pending.entry.compression)?;
        debug!(
            name = %pending.entry.name,
            compression = %pending.entry.compression,
            size = data.len(),
            compressed_size = compressed.len(),
            "Payload compressed"
        );
        Ok(Payload {
            entry: pending.entry.clone(),
            data: compressed,
        })
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> FirmSealResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).with_path(&dir)?;
    let mut file = tempfile::NamedTempFile::new_in(&dir).with_path(&dir)?;
    file.write_all(bytes).with_path(file.path())?;
    file.persist(path)
        .map_err(|e| FirmSealError::io(path, e.error))?;
    Ok(())
}
