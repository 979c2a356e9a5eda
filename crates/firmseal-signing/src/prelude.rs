//! Prelude module for convenient imports.

pub use crate::config::SignerConfig;
pub use crate::image::{ParsedFirmware, SignedFirmwareImage};
pub use crate::report::{
    BatchEntry, BatchFailure, BatchReport, BatchSignReport, BatchSummary, BatchVerifyReport,
    HeaderChecks, SignReport, VerificationReport,
};
pub use crate::signer::FirmwareSigner;
pub use crate::verifier::FirmwareVerifier;
pub use firmseal_errors::{FirmSealError, FirmSealResult};
pub use firmseal_header::{FirmwareHeader, FirmwareVersion, HashAlgorithm, SignatureAlgorithm};
