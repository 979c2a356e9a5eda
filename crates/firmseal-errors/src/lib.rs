//! Error types for the FirmSeal secure firmware pipeline
//!
//! Every crate in the workspace reports failures through [`FirmSealError`],
//! which wraps one sub-error per failure class:
//!
//! - [`format`]: malformed headers, archives, and manifests
//! - [`algorithm`]: unknown or unsupported algorithm identifiers
//! - [`key`]: unreadable or wrong-type key material
//! - [`integrity`]: hash, CRC, and checksum mismatches
//! - [`signature`]: RSA-PSS signing and verification failures
//!
//! Filesystem failures carry the offending path so batch reports can name it.
//!
//! # Example
//!
//! ```
//! use firmseal_errors::prelude::*;
//!
//! fn check_magic(found: [u8; 4]) -> FirmSealResult<()> {
//!     if &found != b"FWSV" {
//!         return Err(FormatError::BadMagic { expected: *b"FWSV", found }.into());
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_magic(*b"FWSV").is_ok());
//! assert_eq!(
//!     check_magic(*b"ABCD").map_err(|e| e.category()).err(),
//!     Some(ErrorCategory::Format)
//! );
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod algorithm;
pub mod common;
pub mod format;
pub mod integrity;
pub mod key;
pub mod prelude;
pub mod signature;

pub use algorithm::{AlgorithmError, AlgorithmKind};
pub use common::{ErrorCategory, FirmSealError, IoResultExt};
pub use format::FormatError;
pub use integrity::IntegrityError;
pub use key::KeyError;
pub use signature::SignatureError;

/// A specialized `Result` type for FirmSeal operations.
pub type FirmSealResult<T> = std::result::Result<T, FirmSealError>;
