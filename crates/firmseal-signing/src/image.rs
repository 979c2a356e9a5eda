//! Signed image container and its borrowed parsed view.

use std::path::Path;

use firmseal_errors::{FirmSealResult, FormatError, IoResultExt};
use firmseal_header::{FirmwareHeader, HEADER_SIZE};

/// `header ‖ firmware ‖ signature`, assembled once by the signer.
///
/// The bytes are never modified after assembly; producing a different
/// version means signing again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedFirmwareImage {
    header: FirmwareHeader,
    bytes: Vec<u8>,
}

impl SignedFirmwareImage {
    pub(crate) fn assemble(header: FirmwareHeader, firmware: &[u8], signature: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(HEADER_SIZE + firmware.len() + signature.len());
        bytes.extend_from_slice(&header.pack());
        bytes.extend_from_slice(firmware);
        bytes.extend_from_slice(signature);
        Self { header, bytes }
    }

    /// The header written at the front of the image.
    pub fn header(&self) -> &FirmwareHeader {
        &self.header
    }

    /// The complete image.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The firmware section.
    pub fn firmware(&self) -> &[u8] {
        let end = HEADER_SIZE.saturating_add(self.header.firmware_size as usize);
        self.bytes.get(HEADER_SIZE..end).unwrap_or_default()
    }

    /// The signature section.
    pub fn signature(&self) -> &[u8] {
        let start = HEADER_SIZE.saturating_add(self.header.firmware_size as usize);
        self.bytes.get(start..).unwrap_or_default()
    }

    /// Total image length.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True only for an image with no bytes, which the signer never produces.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consume the image, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Write the image to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an I/O error naming the path that failed.
    pub fn write_to(&self, path: &Path) -> FirmSealResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_path(parent)?;
        }
        std::fs::write(path, &self.bytes).with_path(path)
    }
}

/// Borrowed sections of a signed image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFirmware<'a> {
    /// Decoded header
    pub header: FirmwareHeader,
    /// Firmware section, `header.firmware_size` bytes
    pub firmware: &'a [u8],
    /// Signature section, `header.signature_size` bytes
    pub signature: &'a [u8],
    /// Bytes past the declared end of the image
    pub trailing: usize,
}

impl<'a> ParsedFirmware<'a> {
    /// Split `bytes` using the sizes declared in its header.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError`] for a short or foreign header, or when a
    /// declared size runs past the end of the buffer.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, FormatError> {
        let header = FirmwareHeader::unpack(bytes)?;
        let body = bytes.get(HEADER_SIZE..).unwrap_or_default();

        let (firmware, rest) = split_declared(body, header.firmware_size, "firmware_size")?;
        let (signature, rest) = split_declared(rest, header.signature_size, "signature_size")?;

        Ok(Self {
            header,
            firmware,
            signature,
            trailing: rest.len(),
        })
    }
}

fn split_declared<'a>(
    buf: &'a [u8],
    declared: u32,
    field: &'static str,
) -> Result<(&'a [u8], &'a [u8]), FormatError> {
    let len = usize::try_from(declared).unwrap_or(usize::MAX);
    if len > buf.len() {
        return Err(FormatError::DeclaredSizeExceedsBuffer {
            field,
            declared: u64::from(declared),
            available: buf.len() as u64,
        });
    }
    Ok(buf.split_at(len))
}
