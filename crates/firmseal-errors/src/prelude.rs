//! Convenience re-exports for error handling.
//!
//! ```
//! use firmseal_errors::prelude::*;
//!
//! fn load() -> FirmSealResult<()> {
//!     Err(KeyError::Missing { purpose: "package signing" }.into())
//! }
//!
//! assert_eq!(load().map_err(|e| e.category()).err(), Some(ErrorCategory::Key));
//! ```

pub use crate::{
    FirmSealResult,
    algorithm::{AlgorithmError, AlgorithmKind},
    common::{ErrorCategory, FirmSealError, IoResultExt},
    format::FormatError,
    integrity::IntegrityError,
    key::KeyError,
    signature::SignatureError,
};
