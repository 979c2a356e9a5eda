//! The 512-byte firmware header and its codec.

use firmseal_errors::{AlgorithmError, FormatError};
use serde::{Deserialize, Serialize};

use crate::algorithm::{HashAlgorithm, SignatureAlgorithm};
use crate::constants::{
    HASH_FIELD_SIZE, HEADER_SIZE, MAGIC, OFFSET_CRC32, OFFSET_FIRMWARE_SIZE,
    OFFSET_HASH, OFFSET_HASH_ALGORITHM, OFFSET_MAGIC, OFFSET_RESERVED,
    OFFSET_SIGNATURE_ALGORITHM, OFFSET_SIGNATURE_SIZE, OFFSET_TIMESTAMP, OFFSET_VERSION,
    RESERVED_SIZE,
};
use crate::version::FirmwareVersion;

/// Decoded firmware header.
///
/// Every field has its wire width, so any value held here packs without
/// loss. Width checks happen when values enter the struct, through
/// [`FirmwareVersion::from_components`], [`FirmwareHeader::set_digest`],
/// [`FirmwareHeader::set_firmware_size`], and
/// [`FirmwareHeader::set_signature_size`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareHeader {
    /// Magic bytes, [`MAGIC`] for valid images
    pub magic: [u8; 4],
    /// Firmware version
    pub version: FirmwareVersion,
    /// Signing time, unix seconds
    pub timestamp: u64,
    /// Length of the firmware section
    pub firmware_size: u32,
    /// Wire id of the digest algorithm
    pub hash_algorithm_id: u16,
    /// Wire id of the signature algorithm
    pub signature_algorithm_id: u16,
    /// Digest of the firmware, zero padded to 64 bytes
    pub hash: [u8; HASH_FIELD_SIZE],
    /// Length of the signature section
    pub signature_size: u32,
    /// CRC32 of the firmware
    pub crc32: u32,
    /// Reserved, zero when written by the signer
    pub reserved: [u8; RESERVED_SIZE],
}

impl FirmwareHeader {
    /// Create a header with default algorithms and zeroed sizes.
    pub fn new(version: FirmwareVersion) -> Self {
        Self {
            magic: MAGIC,
            version,
            timestamp: 0,
            firmware_size: 0,
            hash_algorithm_id: HashAlgorithm::default().id(),
            signature_algorithm_id: SignatureAlgorithm::default().id(),
            hash: [0; HASH_FIELD_SIZE],
            signature_size: 0,
            crc32: 0,
            reserved: [0; RESERVED_SIZE],
        }
    }

    /// Encode to exactly [`HEADER_SIZE`] little-endian bytes.
    pub fn pack(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[OFFSET_MAGIC..OFFSET_VERSION].copy_from_slice(&self.magic);
        out[OFFSET_VERSION..OFFSET_TIMESTAMP].copy_from_slice(&self.version.to_bytes());
        out[OFFSET_TIMESTAMP..OFFSET_FIRMWARE_SIZE].copy_from_slice(&self.timestamp.to_le_bytes());
        out[OFFSET_FIRMWARE_SIZE..OFFSET_HASH_ALGORITHM]
            .copy_from_slice(&self.firmware_size.to_le_bytes());
        out[OFFSET_HASH_ALGORITHM..OFFSET_SIGNATURE_ALGORITHM]
            .copy_from_slice(&self.hash_algorithm_id.to_le_bytes());
        out[OFFSET_SIGNATURE_ALGORITHM..OFFSET_HASH]
            .copy_from_slice(&self.signature_algorithm_id.to_le_bytes());
        out[OFFSET_HASH..OFFSET_SIGNATURE_SIZE].copy_from_slice(&self.hash);
        out[OFFSET_SIGNATURE_SIZE..OFFSET_CRC32].copy_from_slice(&self.signature_size.to_le_bytes());
        out[OFFSET_CRC32..OFFSET_RESERVED].copy_from_slice(&self.crc32.to_le_bytes());
        out[OFFSET_RESERVED..HEADER_SIZE].copy_from_slice(&self.reserved);
        out
    }

    /// Decode a header from the start of `bytes`.
    ///
    /// Bytes past [`HEADER_SIZE`] are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Truncated`] if fewer than [`HEADER_SIZE`] bytes
    /// are given and [`FormatError::BadMagic`] if the magic does not match.
    pub fn unpack(bytes: &[u8]) -> Result<Self, FormatError> {
        let mut reader = FieldReader { rest: bytes };
        if bytes.len() < HEADER_SIZE {
            return Err(FormatError::truncated("firmware header", HEADER_SIZE, bytes.len()));
        }

        let magic: [u8; 4] = reader.take()?;
        if magic != MAGIC {
            return Err(FormatError::BadMagic {
                expected: MAGIC,
                found: magic,
            });
        }

        Ok(Self {
            magic,
            version: FirmwareVersion::from_bytes(reader.take()?),
            timestamp: u64::from_le_bytes(reader.take()?),
            firmware_size: u32::from_le_bytes(reader.take()?),
            hash_algorithm_id: u16::from_le_bytes(reader.take()?),
            signature_algorithm_id: u16::from_le_bytes(reader.take()?),
            hash: reader.take()?,
            signature_size: u32::from_le_bytes(reader.take()?),
            crc32: u32::from_le_bytes(reader.take()?),
            reserved: reader.take()?,
        })
    }

    /// Store a digest, zero padding the rest of the field.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::FieldOverflow`] for digests longer than
    /// [`HASH_FIELD_SIZE`].
    pub fn set_digest(&mut self, digest: &[u8]) -> Result<(), FormatError> {
        let Some(slot) = self.hash.get_mut(..digest.len()) else {
            return Err(FormatError::overflow(
                "hash",
                digest.len() as u64,
                HASH_FIELD_SIZE as u64,
            ));
        };
        slot.copy_from_slice(digest);
        if let Some(padding) = self.hash.get_mut(digest.len()..) {
            padding.fill(0);
        }
        Ok(())
    }

    /// The first `len` bytes of the digest field.
    pub fn stored_digest(&self, len: usize) -> Option<&[u8]> {
        self.hash.get(..len)
    }

    /// Set the firmware length.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::FieldOverflow`] above `u32::MAX`.
    pub fn set_firmware_size(&mut self, len: usize) -> Result<(), FormatError> {
        self.firmware_size = narrow_u32("firmware_size", len)?;
        Ok(())
    }

    /// Set the signature length.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::FieldOverflow`] above `u32::MAX`.
    pub fn set_signature_size(&mut self, len: usize) -> Result<(), FormatError> {
        self.signature_size = narrow_u32("signature_size", len)?;
        Ok(())
    }

    /// Resolve the digest algorithm id.
    ///
    /// # Errors
    ///
    /// Returns [`AlgorithmError::UnknownId`] for ids outside the table.
    pub fn hash_algorithm(&self) -> Result<HashAlgorithm, AlgorithmError> {
        HashAlgorithm::from_id(self.hash_algorithm_id)
    }

    /// Resolve the signature algorithm id.
    ///
    /// # Errors
    ///
    /// Returns [`AlgorithmError::UnknownId`] for ids outside the table.
    pub fn signature_algorithm(&self) -> Result<SignatureAlgorithm, AlgorithmError> {
        SignatureAlgorithm::from_id(self.signature_algorithm_id)
    }

    /// Total length of `header ‖ firmware ‖ signature` as declared.
    pub fn declared_image_len(&self) -> u64 {
        HEADER_SIZE as u64 + u64::from(self.firmware_size) + u64::from(self.signature_size)
    }

    /// Human-readable rendering of the header.
    pub fn summary(&self) -> HeaderSummary {
        let digest_len = self
            .hash_algorithm()
            .map_or(HASH_FIELD_SIZE, HashAlgorithm::digest_len);
        let hash = self.stored_digest(digest_len).unwrap_or(&self.hash);

        HeaderSummary {
            magic: self.magic.escape_ascii().to_string(),
            version: self.version.to_string(),
            timestamp: self.timestamp,
            timestamp_iso: i64::try_from(self.timestamp)
                .ok()
                .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
                .map(|dt| dt.to_rfc3339()),
            firmware_size: self.firmware_size,
            hash_algorithm: format!("0x{:04X}", self.hash_algorithm_id),
            signature_algorithm: format!("0x{:04X}", self.signature_algorithm_id),
            hash: hex::encode(hash),
            signature_size: self.signature_size,
            crc32: format!("0x{:08X}", self.crc32),
        }
    }
}

/// Serializable view of a header for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderSummary {
    /// Magic as escaped text
    pub magic: String,
    /// Dotted version
    pub version: String,
    /// Unix timestamp
    pub timestamp: u64,
    /// RFC 3339 timestamp, absent when out of range
    pub timestamp_iso: Option<String>,
    /// Firmware length
    pub firmware_size: u32,
    /// Hash algorithm id as `0xNNNN`
    pub hash_algorithm: String,
    /// Signature algorithm id as `0xNNNN`
    pub signature_algorithm: String,
    /// Hex digest, truncated to the digest length when the id is known
    pub hash: String,
    /// Signature length
    pub signature_size: u32,
    /// CRC32 as `0xNNNNNNNN`
    pub crc32: String,
}

fn narrow_u32(field: &'static str, len: usize) -> Result<u32, FormatError> {
    u32::try_from(len).or(Err(FormatError::overflow(
        field,
        len as u64,
        u64::from(u32::MAX),
    )))
}

struct FieldReader<'a> {
    rest: &'a [u8],
}

impl FieldReader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], FormatError> {
        let (head, tail) = self
            .rest
            .split_first_chunk::<N>()
            .ok_or(FormatError::truncated("firmware header", N, self.rest.len()))?;
        self.rest = tail;
        Ok(*head)
    }
}
