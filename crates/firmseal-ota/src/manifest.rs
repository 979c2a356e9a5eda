//! OTA manifest record.
//!
//! The manifest is the JSON document an updater reads to pick a slot,
//! evaluate rollback protection, and locate each payload. Field names
//! match what deployed updaters already parse.

use core::fmt;
use std::path::Path;
use std::str::FromStr;

use firmseal_errors::{AlgorithmError, AlgorithmKind, FirmSealResult, IoResultExt};
use firmseal_header::{FirmwareVersion, HashAlgorithm, SignatureAlgorithm};
use serde::{Deserialize, Serialize};

use crate::compression::CompressionType;
use crate::encryption::{CipherMode, EncryptionAlgorithm};

/// Manifest schema version written by this crate.
pub const MANIFEST_FORMAT_VERSION: &str = "1.0.0";

/// Archive entry holding the manifest.
pub const MANIFEST_ENTRY: &str = "manifest.json";

/// Suffix appended to a payload name inside the archive.
pub const PAYLOAD_SUFFIX: &str = ".compressed";

/// Free space to demand per byte of uncompressed payload.
pub const FREE_SPACE_FACTOR: u64 = 2;

/// Minimum battery level, in percent, before an install starts.
pub const DEFAULT_BATTERY_LEVEL: u8 = 30;

/// How the package relates to what is already installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    /// Complete images
    #[default]
    Full,
    /// Binary patches against the installed images
    Delta,
    /// Changed files only
    Incremental,
}

impl PackageType {
    /// Accepted names.
    pub const NAMES: &'static [&'static str] = &["full", "delta", "incremental"];

    /// Lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            PackageType::Full => "full",
            PackageType::Delta => "delta",
            PackageType::Incremental => "incremental",
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PackageType {
    type Err = AlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(PackageType::Full),
            "delta" => Ok(PackageType::Delta),
            "incremental" => Ok(PackageType::Incremental),
            _ => Err(AlgorithmError::unsupported(
                AlgorithmKind::PackageType,
                s,
                Self::NAMES,
            )),
        }
    }
}

/// What a payload is installed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Application firmware
    Firmware,
    /// Bootloader image
    Bootloader,
    /// Kernel image
    Kernel,
    /// Root filesystem image
    Rootfs,
    /// Opaque data
    Data,
    /// Binary patch, see [`crate::delta`]
    Patch,
}

impl FileType {
    /// Accepted names.
    pub const NAMES: &'static [&'static str] =
        &["firmware", "bootloader", "kernel", "rootfs", "data", "patch"];

    /// Lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            FileType::Firmware => "firmware",
            FileType::Bootloader => "bootloader",
            FileType::Kernel => "kernel",
            FileType::Rootfs => "rootfs",
            FileType::Data => "data",
            FileType::Patch => "patch",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FileType {
    type Err = AlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "firmware" => Ok(FileType::Firmware),
            "bootloader" => Ok(FileType::Bootloader),
            "kernel" => Ok(FileType::Kernel),
            "rootfs" => Ok(FileType::Rootfs),
            "data" => Ok(FileType::Data),
            "patch" => Ok(FileType::Patch),
            _ => Err(AlgorithmError::unsupported(
                AlgorithmKind::FileType,
                s,
                Self::NAMES,
            )),
        }
    }
}

/// A/B slot the updater should write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetSlot {
    /// Whichever slot is inactive
    #[default]
    #[serde(rename = "auto")]
    Auto,
    /// Slot A
    A,
    /// Slot B
    B,
}

impl TargetSlot {
    /// Accepted names.
    pub const NAMES: &'static [&'static str] = &["auto", "A", "B"];

    /// Name as written in the manifest.
    pub fn name(self) -> &'static str {
        match self {
            TargetSlot::Auto => "auto",
            TargetSlot::A => "A",
            TargetSlot::B => "B",
        }
    }
}

impl fmt::Display for TargetSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TargetSlot {
    type Err = AlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" | "AUTO" | "Auto" => Ok(TargetSlot::Auto),
            "A" | "a" => Ok(TargetSlot::A),
            "B" | "b" => Ok(TargetSlot::B),
            _ => Err(AlgorithmError::unsupported(
                AlgorithmKind::TargetSlot,
                s,
                Self::NAMES,
            )),
        }
    }
}

/// Firmware version in both component and dotted form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersionInfo {
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
    /// Patch version
    pub patch: u8,
    /// Build number
    pub build: u8,
    /// `major.minor.patch.build`
    pub version_string: String,
}

impl From<FirmwareVersion> for FirmwareVersionInfo {
    fn from(v: FirmwareVersion) -> Self {
        Self {
            major: v.major,
            minor: v.minor,
            patch: v.patch,
            build: v.build,
            version_string: v.to_string(),
        }
    }
}

impl FirmwareVersionInfo {
    /// The version as a comparable value.
    pub fn version(&self) -> FirmwareVersion {
        FirmwareVersion::new(self.major, self.minor, self.patch, self.build)
    }
}

impl Default for FirmwareVersionInfo {
    fn default() -> Self {
        FirmwareVersion::new(1, 0, 0, 0).into()
    }
}

/// Device the package is built for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDevice {
    /// Model identifier
    pub model: String,
    /// Hardware revision
    pub hardware_version: String,
}

impl Default for TargetDevice {
    fn default() -> Self {
        Self {
            model: "unknown".to_string(),
            hardware_version: "1.0".to_string(),
        }
    }
}

/// A/B update policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbUpdate {
    /// Install into the inactive slot
    pub enabled: bool,
    /// Slot to write
    pub target_slot: TargetSlot,
    /// Verify the new slot before switching to it
    pub verify_before_reboot: bool,
    /// Fall back to the previous slot if the new one fails to boot
    pub fallback_enabled: bool,
}

impl Default for AbUpdate {
    fn default() -> Self {
        Self {
            enabled: true,
            target_slot: TargetSlot::Auto,
            verify_before_reboot: true,
            fallback_enabled: true,
        }
    }
}

/// One payload in the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Source file name; the archive entry is `<name>.compressed`
    pub name: String,
    /// Install path on the device
    pub path: String,
    /// Uncompressed size in bytes
    pub size: u64,
    /// Hex digest of the uncompressed bytes
    pub checksum: String,
    /// Payload kind
    #[serde(rename = "type")]
    pub file_type: FileType,
    /// Codec used for the archive entry
    pub compression: CompressionType,
    /// Target partition
    pub partition: String,
    /// Size of the archive entry
    pub compressed_size: u64,
    /// Running offset of this payload among all compressed payloads
    pub offset: u64,
}

impl FileEntry {
    /// Name of the archive entry carrying this payload.
    pub fn archive_name(&self) -> String {
        format!("{}{PAYLOAD_SUFFIX}", self.name)
    }
}

/// Package and manifest digests.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Checksums {
    /// Digest used for every checksum in the manifest
    pub algorithm: HashAlgorithm,
    /// Digest of the archive that embeds the manifest with this field blank
    pub package_checksum: String,
    /// Digest of the manifest with both checksum fields blank
    pub manifest_checksum: String,
}

/// Declarative rollback policy. Enforcement belongs to the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackProtection {
    /// Refuse older firmware
    pub enabled: bool,
    /// Lowest version the device may run after this update
    pub minimum_version: String,
    /// Security patch level this package carries
    pub security_patch_level: u32,
}

impl Default for RollbackProtection {
    fn default() -> Self {
        Self {
            enabled: true,
            minimum_version: FirmwareVersionInfo::default().version_string,
            security_patch_level: 1,
        }
    }
}

/// Preconditions checked before installing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreInstall {
    /// Bytes of free space required
    pub required_free_space: u64,
    /// Minimum battery percentage
    pub battery_level: u8,
}

impl Default for PreInstall {
    fn default() -> Self {
        Self {
            required_free_space: 0,
            battery_level: DEFAULT_BATTERY_LEVEL,
        }
    }
}

/// Actions after installing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostInstall {
    /// Reboot into the new image
    pub reboot_required: bool,
    /// Seconds the new image has to confirm itself
    pub verification_timeout: u32,
}

impl Default for PostInstall {
    fn default() -> Self {
        Self {
            reboot_required: true,
            verification_timeout: 60,
        }
    }
}

/// Free-form package description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Who built the package
    pub author: String,
    /// Human-readable summary
    pub description: String,
    /// One line per change
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changelog: Vec<String>,
    /// Search tags
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Default for PackageMetadata {
    fn default() -> Self {
        Self {
            author: "OTA Builder".to_string(),
            description: "Firmware OTA update package".to_string(),
            changelog: Vec::new(),
            tags: Vec::new(),
        }
    }
}

/// How the package bytes were encrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionInfo {
    /// Always true when present
    pub enabled: bool,
    /// AES key size
    pub algorithm: EncryptionAlgorithm,
    /// Cipher mode
    pub mode: CipherMode,
    /// Hex IV, also the first 16 bytes of the package
    pub iv: String,
}

/// Signature over the final package bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSignature {
    /// Key size of the signer
    pub algorithm: SignatureAlgorithm,
    /// Digest used in the PSS encoding
    pub hash_algorithm: HashAlgorithm,
    /// Base64 RSA-PSS signature
    pub signature: String,
    /// Hex SHA-256 of the signer's SPKI public key
    pub fingerprint: String,
    /// RFC 3339 signing time
    pub signing_date: String,
}

/// The complete manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtaManifest {
    /// Manifest schema version
    #[serde(rename = "version")]
    pub format_version: String,
    /// Full, delta or incremental
    pub package_type: PackageType,
    /// Build firmware version
    pub firmware_version: FirmwareVersionInfo,
    /// RFC 3339 build time
    pub build_date: String,
    /// Intended device
    pub target_device: TargetDevice,
    /// Slot policy
    pub ab_update: AbUpdate,
    /// Payloads in archive order
    pub files: Vec<FileEntry>,
    /// Package and manifest digests
    pub checksums: Checksums,
    /// Rollback policy
    pub rollback_protection: RollbackProtection,
    /// Install preconditions
    pub pre_install: PreInstall,
    /// Post-install actions
    pub post_install: PostInstall,
    /// Description and tags
    pub metadata: PackageMetadata,
    /// Present when the package bytes are encrypted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionInfo>,
    /// Present when the package bytes are signed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<PackageSignature>,
}

impl Default for OtaManifest {
    fn default() -> Self {
        Self {
            format_version: MANIFEST_FORMAT_VERSION.to_string(),
            package_type: PackageType::default(),
            firmware_version: FirmwareVersionInfo::default(),
            build_date: String::new(),
            target_device: TargetDevice::default(),
            ab_update: AbUpdate::default(),
            files: Vec::new(),
            checksums: Checksums::default(),
            rollback_protection: RollbackProtection::default(),
            pre_install: PreInstall::default(),
            post_install: PostInstall::default(),
            metadata: PackageMetadata::default(),
            encryption: None,
            signature: None,
        }
    }
}

impl OtaManifest {
    /// Pretty-printed JSON, the exact bytes that get hashed and archived.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if encoding fails.
    pub fn to_json_bytes(&self) -> FirmSealResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Parse manifest JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization error for malformed JSON or unknown enum values.
    pub fn from_json_slice(bytes: &[u8]) -> FirmSealResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Read a manifest file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed.
    pub fn read_from(path: impl AsRef<Path>) -> FirmSealResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_path(path)?;
        Self::from_json_slice(&bytes)
    }

    /// Write the manifest as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written.
    pub fn write_to(&self, path: impl AsRef<Path>) -> FirmSealResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_path(parent)?;
        }
        std::fs::write(path, self.to_json_bytes()?).with_path(path)
    }

    /// Copy of the manifest as it was hashed for `manifest_checksum`.
    pub fn checksum_draft(&self) -> Self {
        let mut draft = self.staged();
        draft.checksums.manifest_checksum.clear();
        draft
    }

    /// Copy of the manifest as it sits inside the archive that
    /// `package_checksum` covers.
    pub fn staged(&self) -> Self {
        let mut staged = self.packaged();
        staged.checksums.package_checksum.clear();
        staged
    }

    /// Copy of the manifest as it sits inside the final archive.
    ///
    /// Encryption and signature details only exist after the archive is
    /// sealed, so they live in the sibling manifest alone.
    pub fn packaged(&self) -> Self {
        let mut packaged = self.clone();
        packaged.encryption = None;
        packaged.signature = None;
        packaged
    }

    /// Sum of uncompressed payload sizes.
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).fold(0u64, u64::saturating_add)
    }

    /// Sum of compressed payload sizes.
    pub fn total_compressed_size(&self) -> u64 {
        self.files
            .iter()
            .map(|f| f.compressed_size)
            .fold(0u64, u64::saturating_add)
    }

    /// True if every payload starts where the previous one ended.
    pub fn offsets_are_contiguous(&self) -> bool {
        let mut expected = 0u64;
        for file in &self.files {
            if file.offset != expected {
                return false;
            }
            expected = expected.saturating_add(file.compressed_size);
        }
        true
    }

    /// Entry for the payload called `name`.
    pub fn file(&self, name: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.name == name)
    }
}

/// Path of the manifest written next to a package.
///
/// `update.ota` maps to `update.manifest.json`; any other name gets
/// `.manifest.json` appended.
pub fn sibling_manifest_path(package: &Path) -> std::path::PathBuf {
    let file_name = package
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let sibling = match file_name.strip_suffix(".ota") {
        Some(stem) => format!("{stem}.manifest.json"),
        None => format!("{file_name}.manifest.json"),
    };
    package.with_file_name(sibling)
}
