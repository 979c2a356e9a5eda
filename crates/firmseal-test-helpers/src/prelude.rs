//! Convenience re-exports for common test utilities.

pub use crate::fixtures::{
    KeyPairFiles, firmware_blob, rsa2048_other_public, rsa2048_private, rsa2048_public,
    temp_dir, write_firmware, write_key_pair, write_rsa2048_pair,
};
pub use crate::must::{must, must_some, must_with};

/// Result type for tests that use `?`.
pub type TestResult = Result<(), Box<dyn std::error::Error>>;
