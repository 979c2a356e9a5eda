//! Four-component firmware version stored as one byte per component.

use core::fmt;
use std::str::FromStr;

use firmseal_errors::FormatError;
use serde::{Deserialize, Serialize};

const COMPONENT_NAMES: [&str; 4] = [
    "version.major",
    "version.minor",
    "version.patch",
    "version.build",
];

/// Firmware version as written into the header.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct FirmwareVersion {
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
    /// Patch version
    pub patch: u8,
    /// Build number
    pub build: u8,
}

impl FirmwareVersion {
    /// Create a version from byte components.
    pub const fn new(major: u8, minor: u8, patch: u8, build: u8) -> Self {
        Self {
            major,
            minor,
            patch,
            build,
        }
    }

    /// Create a version from wide components, rejecting any above 255.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::FieldOverflow`] naming the first component that
    /// does not fit in a byte.
    pub fn from_components(components: [u64; 4]) -> Result<Self, FormatError> {
        let mut bytes = [0u8; 4];
        for ((slot, value), field) in bytes.iter_mut().zip(components).zip(COMPONENT_NAMES) {
            *slot = match u8::try_from(value) {
                Ok(byte) => byte,
                Err(_) => return Err(FormatError::overflow(field, value, u64::from(u8::MAX))),
            };
        }
        Ok(Self::from_bytes(bytes))
    }

    /// Parse `MAJOR.MINOR.PATCH` or `MAJOR.MINOR.PATCH.BUILD`.
    ///
    /// A missing build component defaults to 0.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::InvalidVersion`] for the wrong number of
    /// components or non-numeric text, and [`FormatError::FieldOverflow`]
    /// when a component exceeds 255.
    pub fn parse(input: &str) -> Result<Self, FormatError> {
        let parts: Vec<&str> = input.trim().split('.').collect();
        if !(3..=4).contains(&parts.len()) {
            return Err(FormatError::invalid_version(
                input,
                "expected MAJOR.MINOR.PATCH[.BUILD]",
            ));
        }

        let mut components = [0u64; 4];
        for (slot, part) in components.iter_mut().zip(&parts) {
            *slot = part.parse::<u64>().map_err(|e| {
                FormatError::invalid_version(input, format!("component '{part}': {e}"))
            })?;
        }
        Self::from_components(components)
    }

    /// Wire bytes in header order.
    pub const fn to_bytes(self) -> [u8; 4] {
        [self.major, self.minor, self.patch, self.build]
    }

    /// Build from wire bytes in header order.
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        let [major, minor, patch, build] = bytes;
        Self::new(major, minor, patch, build)
    }

    /// All four components are zero, as in a blank header.
    pub const fn is_zero(self) -> bool {
        self.major == 0 && self.minor == 0 && self.patch == 0 && self.build == 0
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.patch, self.build
        )
    }
}

impl FromStr for FirmwareVersion {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_four_components() -> Result<(), FormatError> {
        assert_eq!(FirmwareVersion::parse("1.2.3.4")?, FirmwareVersion::new(1, 2, 3, 4));
        Ok(())
    }

    #[test]
    fn test_build_defaults_to_zero() -> Result<(), FormatError> {
        assert_eq!(FirmwareVersion::parse("2.0.1")?, FirmwareVersion::new(2, 0, 1, 0));
        Ok(())
    }

    #[test]
    fn test_component_over_255_overflows() {
        assert_eq!(
            FirmwareVersion::parse("1.256.0"),
            Err(FormatError::overflow("version.minor", 256, 255))
        );
    }

    #[test]
    fn test_wrong_shapes_rejected() {
        for input in ["", "1", "1.2", "1.2.3.4.5", "1.x.3", "1.-2.3"] {
            assert!(
                matches!(
                    FirmwareVersion::parse(input),
                    Err(FormatError::InvalidVersion { .. })
                ),
                "{input}"
            );
        }
    }

    #[test]
    fn test_ordering_is_component_wise() {
        assert!(FirmwareVersion::new(1, 2, 0, 0) > FirmwareVersion::new(1, 1, 9, 9));
        assert!(FirmwareVersion::new(1, 2, 3, 1) > FirmwareVersion::new(1, 2, 3, 0));
    }

    #[test]
    fn test_display_is_dotted_quad() {
        assert_eq!(FirmwareVersion::new(10, 0, 7, 255).to_string(), "10.0.7.255");
    }
}
