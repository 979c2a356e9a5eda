//! OTA update packages: manifest, staged build pipeline, and verification
//!
//! [`OtaManifestBuilder`] collects payloads and metadata, then assembles a
//! tar package whose manifest carries both its own checksum and the
//! checksum of the archive around it. The package may be encrypted with
//! AES and signed with RSA-PSS. [`PackageVerifier`] re-derives every
//! recorded value on the consumer side.
//!
//! # Modules
//!
//! - [`manifest`]: the manifest record and its staged views
//! - [`compression`]: payload codecs
//! - [`encryption`]: AES-GCM/CBC/CTR package encryption
//! - [`archive`]: deterministic tar writer and reader
//! - [`pipeline`]: the build stages as separate types
//! - [`builder`]: the file-based front end over the pipeline
//! - [`verify`]: package verification
//! - [`delta`]: binary patches for delta packages
//!
//! # Example
//!
//! ```no_run
//! use firmseal_ota::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut builder = OtaManifestBuilder::new(OtaBuilderConfig::default());
//! builder
//!     .set_version("2.1.0".parse()?)
//!     .set_target_device("gateway-x1", "rev-c");
//! builder.add_file("build/app.bin", FileType::Firmware, None, Some("app"), None)?;
//!
//! let options = BuildOptions::default()
//!     .signed_with("keys/private.pem")
//!     .encrypted_with("00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff");
//! let output = builder.build("dist/update.ota", &options)?;
//!
//! let report = PackageVerifier::new()
//!     .with_public_key_file("keys/public.pem")?
//!     .with_decryption_key("00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff")
//!     .verify_file(&output.package_path)?;
//! assert!(report.overall_valid);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod archive;
pub mod builder;
pub mod compression;
pub mod config;
pub mod delta;
pub mod encryption;
pub mod manifest;
pub mod pipeline;
pub mod prelude;
pub mod verify;

pub use builder::{BuildOutput, OtaManifestBuilder};
pub use compression::CompressionType;
pub use config::{BuildOptions, OtaBuilderConfig};
pub use encryption::{CipherMode, EncryptionAlgorithm, EncryptionKey};
pub use manifest::{FileEntry, FileType, OtaManifest, PackageType, TargetSlot};
pub use pipeline::BuildStage;
pub use verify::{FileCheck, PackageVerificationReport, PackageVerifier};
