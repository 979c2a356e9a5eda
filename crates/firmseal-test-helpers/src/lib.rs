//! Shared test utilities for FirmSeal.
//!
//! - [`mod@must`] - Unwrap helpers with good error messages and `#[track_caller]`
//! - [`fixtures`] - Fixed RSA key pairs and deterministic firmware blobs
//! - [`prelude`] - Convenience re-exports
//!
//! The key fixtures are checked-in PEM files, so tests never pay for RSA
//! key generation.
//!
//! ```rust,ignore
//! use firmseal_test_helpers::prelude::*;
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::unwrap_used, clippy::panic)]

pub mod fixtures;
pub mod must;
pub mod prelude;

pub use must::*;
