//! Payload compression codecs.
//!
//! Deflate and bzip2 run at their strongest setting; xz runs at preset 6,
//! which keeps the encoder under 100 MiB. Gzip streams carry no name and a
//! zero mtime, so the same input always yields the same payload.

use core::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;

use firmseal_errors::{AlgorithmError, AlgorithmKind, FirmSealError, FirmSealResult};
use serde::{Deserialize, Serialize};

/// xz preset used for [`CompressionType::Lzma`].
pub const XZ_PRESET: u32 = 6;

/// Compression applied to a single payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    /// Stored as-is
    None,
    /// gzip (RFC 1952)
    #[default]
    Gzip,
    /// zlib (RFC 1950)
    Zlib,
    /// xz container around LZMA2
    Lzma,
    /// bzip2
    Bzip2,
}

impl CompressionType {
    /// Accepted names.
    pub const NAMES: &'static [&'static str] = &["none", "gzip", "zlib", "lzma", "bzip2"];

    /// Lowercase codec name.
    pub fn name(self) -> &'static str {
        match self {
            CompressionType::None => "none",
            CompressionType::Gzip => "gzip",
            CompressionType::Zlib => "zlib",
            CompressionType::Lzma => "lzma",
            CompressionType::Bzip2 => "bzip2",
        }
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompressionType {
    type Err = AlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(CompressionType::None),
            "gzip" => Ok(CompressionType::Gzip),
            "zlib" => Ok(CompressionType::Zlib),
            "lzma" => Ok(CompressionType::Lzma),
            "bzip2" => Ok(CompressionType::Bzip2),
            _ => Err(AlgorithmError::unsupported(
                AlgorithmKind::Compression,
                s,
                Self::NAMES,
            )),
        }
    }
}

/// Compress `data` with `kind`.
///
/// # Errors
///
/// Returns [`FirmSealError::Compression`] if the encoder fails.
pub fn compress(data: &[u8], kind: CompressionType) -> FirmSealResult<Vec<u8>> {
    encode(data, kind)
        .map_err(|e| FirmSealError::compression(format!("{kind} compression failed: {e}")))
}

/// Decompress `data` that was produced with `kind`.
///
/// # Errors
///
/// Returns [`FirmSealError::Compression`] if the stream is corrupt.
pub fn decompress(data: &[u8], kind: CompressionType) -> FirmSealResult<Vec<u8>> {
    decompress_limited(data, kind, u64::MAX)
}

/// Decompress `data`, refusing to produce more than `limit` bytes.
///
/// # Errors
///
/// Returns [`FirmSealError::Compression`] if the stream is corrupt or
/// expands past `limit`.
pub fn decompress_limited(data: &[u8], kind: CompressionType, limit: u64) -> FirmSealResult<Vec<u8>> {
    let out = decode(data, kind, limit)
        .map_err(|e| FirmSealError::compression(format!("{kind} decompression failed: {e}")))?;
    if out.len() as u64 > limit {
        return Err(FirmSealError::compression(format!(
            "{kind} payload expands past {limit} bytes"
        )));
    }
    Ok(out)
}

fn encode(data: &[u8], kind: CompressionType) -> io::Result<Vec<u8>> {
    match kind {
        CompressionType::None => Ok(data.to_vec()),
        CompressionType::Gzip => {
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::best());
            encoder.write_all(data)?;
            encoder.finish()
        }
        CompressionType::Zlib => {
            let mut encoder =
                flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::best());
            encoder.write_all(data)?;
            encoder.finish()
        }
        CompressionType::Lzma => {
            let mut encoder = xz2::write::XzEncoder::new(Vec::new(), XZ_PRESET);
            encoder.write_all(data)?;
            encoder.finish()
        }
        CompressionType::Bzip2 => {
            let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::best());
            encoder.write_all(data)?;
            encoder.finish()
        }
    }
}

fn decode(data: &[u8], kind: CompressionType, limit: u64) -> io::Result<Vec<u8>> {
    // One byte past the limit is enough to tell an oversized stream apart.
    let cap = limit.saturating_add(1);
    let mut out = Vec::new();
    match kind {
        CompressionType::None => {
            Read::take(data, cap).read_to_end(&mut out)?;
        }
        CompressionType::Gzip => {
            flate2::read::GzDecoder::new(data)
                .take(cap)
                .read_to_end(&mut out)?;
        }
        CompressionType::Zlib => {
            flate2::read::ZlibDecoder::new(data)
                .take(cap)
                .read_to_end(&mut out)?;
        }
        CompressionType::Lzma => {
            xz2::read::XzDecoder::new(data)
                .take(cap)
                .read_to_end(&mut out)?;
        }
        CompressionType::Bzip2 => {
            bzip2::read::BzDecoder::new(data)
                .take(cap)
                .read_to_end(&mut out)?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        b"firmware block ".iter().copied().cycle().take(8192).collect()
    }

    #[test]
    fn test_every_codec_restores_input() -> FirmSealResult<()> {
        let data = sample();
        for name in CompressionType::NAMES {
            let kind: CompressionType = name.parse()?;
            let packed = compress(&data, kind)?;
            assert_eq!(decompress(&packed, kind)?, data, "{kind}");
        }
        Ok(())
    }

    #[test]
    fn test_repetitive_input_shrinks() -> FirmSealResult<()> {
        let data = sample();
        for kind in [
            CompressionType::Gzip,
            CompressionType::Zlib,
            CompressionType::Lzma,
            CompressionType::Bzip2,
        ] {
            assert!(compress(&data, kind)?.len() < data.len(), "{kind}");
        }
        Ok(())
    }

    #[test]
    fn test_gzip_output_is_deterministic() -> FirmSealResult<()> {
        let data = sample();
        assert_eq!(
            compress(&data, CompressionType::Gzip)?,
            compress(&data, CompressionType::Gzip)?
        );
        Ok(())
    }

    #[test]
    fn test_limit_rejects_expansion() -> FirmSealResult<()> {
        let packed = compress(&sample(), CompressionType::Zlib)?;
        let result = decompress_limited(&packed, CompressionType::Zlib, 100);
        assert!(matches!(result, Err(FirmSealError::Compression(_))));
        Ok(())
    }

    #[test]
    fn test_corrupt_stream_is_compression_error() {
        let result = decompress(b"definitely not gzip", CompressionType::Gzip);
        assert!(matches!(result, Err(FirmSealError::Compression(_))));
    }

    #[test]
    fn test_unknown_name_lists_supported() {
        let err = "brotli".parse::<CompressionType>().err();
        assert!(err.is_some_and(|e| e.to_string().contains("none, gzip, zlib, lzma, bzip2")));
    }

    #[test]
    fn test_serde_names() -> Result<(), serde_json::Error> {
        assert_eq!(serde_json::to_string(&CompressionType::Bzip2)?, "\"bzip2\"");
        let parsed: CompressionType = serde_json::from_str("\"none\"")?;
        assert_eq!(parsed, CompressionType::None);
        Ok(())
    }
}
