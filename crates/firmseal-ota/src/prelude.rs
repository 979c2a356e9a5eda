//! Prelude module for convenient imports.

pub use crate::builder::{BuildOutput, OtaManifestBuilder};
pub use crate::compression::CompressionType;
pub use crate::config::{BuildOptions, OtaBuilderConfig};
pub use crate::encryption::{CipherMode, EncryptionAlgorithm, EncryptionKey};
pub use crate::manifest::{
    FileEntry, FileType, OtaManifest, PackageType, TargetSlot, sibling_manifest_path,
};
pub use crate::pipeline::BuildStage;
pub use crate::verify::{FileCheck, PackageVerificationReport, PackageVerifier};
pub use firmseal_errors::{FirmSealError, FirmSealResult};
pub use firmseal_header::{FirmwareVersion, HashAlgorithm};
