//! Signed firmware header codec
//!
//! A signed firmware image is laid out as `header ‖ firmware ‖ signature`,
//! where the header is exactly [`HEADER_SIZE`] bytes, little-endian:
//!
//! | Offset | Size | Field |
//! |-------:|-----:|-------|
//! | 0 | 4 | magic `FWSV` |
//! | 4 | 4 | version major, minor, patch, build |
//! | 8 | 8 | timestamp (unix seconds) |
//! | 16 | 4 | firmware size |
//! | 20 | 2 | hash algorithm id |
//! | 22 | 2 | signature algorithm id |
//! | 24 | 64 | digest, zero padded |
//! | 88 | 4 | signature size |
//! | 92 | 4 | CRC32 of the firmware |
//! | 96 | 416 | reserved |
//!
//! The [`constants`] module and the algorithm tables in [`algorithm`] are the
//! single source for both the signing and verifying sides.
//!
//! # Example
//!
//! ```
//! use firmseal_header::prelude::*;
//!
//! # fn main() -> Result<(), firmseal_errors::FirmSealError> {
//! let mut header = FirmwareHeader::new(FirmwareVersion::new(1, 2, 3, 4));
//! header.timestamp = 1_700_000_000;
//! header.firmware_size = 1024;
//! header.set_digest(&[0xAB; 32])?;
//!
//! let bytes = header.pack();
//! assert_eq!(bytes.len(), HEADER_SIZE);
//! assert_eq!(FirmwareHeader::unpack(&bytes)?, header);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod algorithm;
pub mod constants;
pub mod header;
pub mod prelude;
pub mod version;

pub use algorithm::{HashAlgorithm, SignatureAlgorithm};
pub use constants::{HASH_FIELD_SIZE, HEADER_SIZE, MAGIC, RESERVED_SIZE};
pub use header::{FirmwareHeader, HeaderSummary};
pub use version::FirmwareVersion;
