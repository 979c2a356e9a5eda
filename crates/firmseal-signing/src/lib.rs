//! RSA-PSS signing and verification of firmware images
//!
//! [`FirmwareSigner`] hashes, CRCs, and signs raw firmware, then assembles
//! `header ‖ firmware ‖ signature`. [`FirmwareVerifier`] takes that image
//! apart and re-checks every facet on its own: header fields, digest, CRC32,
//! and (when a public key is available) the signature.
//!
//! # Modules
//!
//! - [`keys`]: PEM key loading and public key fingerprints
//! - [`pss`]: the RSA-PSS primitive, also used for OTA package signatures
//! - [`image`]: the signed image and its parsed view
//! - [`report`]: single and batch reports
//!
//! # Example
//!
//! ```no_run
//! use firmseal_signing::prelude::*;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let signer = FirmwareSigner::from_key_file("keys/private.pem", SignerConfig::default())?;
//! let image = signer.sign_firmware(b"firmware bytes", "1.0.0".parse()?)?;
//!
//! let verifier = FirmwareVerifier::from_key_file("keys/public.pem")?;
//! let report = verifier.verify_bytes(image.as_bytes())?;
//! assert!(report.overall_valid);
//!
//! let batch = signer.sign_directory(Path::new("build"), Path::new("signed"), "*.bin", "1.0.0".parse()?)?;
//! println!("{} of {} signed", batch.summary.passed, batch.summary.total);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod batch;
pub mod config;
pub mod image;
pub mod keys;
pub mod prelude;
pub mod pss;
pub mod report;
pub mod signer;
pub mod verifier;

pub use config::SignerConfig;
pub use image::{ParsedFirmware, SignedFirmwareImage};
pub use report::{
    BatchEntry, BatchFailure, BatchReport, BatchSignReport, BatchSummary, BatchVerifyReport,
    HeaderChecks, SignReport, VerificationReport,
};
pub use signer::FirmwareSigner;
pub use verifier::FirmwareVerifier;
