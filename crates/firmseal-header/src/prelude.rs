//! Prelude module for convenient imports.

pub use crate::algorithm::{HashAlgorithm, SignatureAlgorithm};
pub use crate::constants::{HASH_FIELD_SIZE, HEADER_SIZE, MAGIC, RESERVED_SIZE};
pub use crate::header::{FirmwareHeader, HeaderSummary};
pub use crate::version::FirmwareVersion;
