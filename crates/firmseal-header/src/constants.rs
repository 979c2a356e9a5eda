//! Wire constants shared by the signer and the verifier.

/// Magic bytes at offset 0 of every signed image.
pub const MAGIC: [u8; 4] = *b"FWSV";

/// Total header length in bytes.
pub const HEADER_SIZE: usize = 512;

/// Width of the digest field; shorter digests are zero padded.
pub const HASH_FIELD_SIZE: usize = 64;

/// Width of the reserved tail, always written as zeros.
pub const RESERVED_SIZE: usize = HEADER_SIZE - OFFSET_RESERVED;

/// Byte offsets of each header field.
pub const OFFSET_MAGIC: usize = 0;
/// Offset of the four version bytes.
pub const OFFSET_VERSION: usize = 4;
/// Offset of the `u64` timestamp.
pub const OFFSET_TIMESTAMP: usize = 8;
/// Offset of the `u32` firmware size.
pub const OFFSET_FIRMWARE_SIZE: usize = 16;
/// Offset of the `u16` hash algorithm id.
pub const OFFSET_HASH_ALGORITHM: usize = 20;
/// Offset of the `u16` signature algorithm id.
pub const OFFSET_SIGNATURE_ALGORITHM: usize = 22;
/// Offset of the digest field.
pub const OFFSET_HASH: usize = 24;
/// Offset of the `u32` signature size.
pub const OFFSET_SIGNATURE_SIZE: usize = OFFSET_HASH + HASH_FIELD_SIZE;
/// Offset of the `u32` CRC32.
pub const OFFSET_CRC32: usize = 92;
/// Offset of the reserved block.
pub const OFFSET_RESERVED: usize = 96;

/// Wire id for SHA-256.
pub const HASH_ID_SHA256: u16 = 0x0001;
/// Wire id for SHA-512.
pub const HASH_ID_SHA512: u16 = 0x0002;
/// Wire id for RSA-2048 PSS.
pub const SIG_ID_RSA2048: u16 = 0x0001;
/// Wire id for RSA-4096 PSS.
pub const SIG_ID_RSA4096: u16 = 0x0002;

const _: () = assert!(OFFSET_CRC32 == OFFSET_SIGNATURE_SIZE + 4);
const _: () = assert!(OFFSET_RESERVED == OFFSET_CRC32 + 4);
const _: () = assert!(RESERVED_SIZE == 416);
