//! Binary delta patches for `patch` payloads in delta packages.
//!
//! Patch layout, integers little-endian:
//!
//! ```text
//! "FSDELTA1" | source_len u64 | target_len u64 | target SHA-256 (32) | ops... | 0x00
//! ```
//!
//! Ops are `0x01 offset:u64 len:u64` (copy from the source) and
//! `0x02 len:u64 bytes` (insert literal bytes).

use std::collections::HashMap;
use std::path::Path;

use firmseal_errors::{FirmSealResult, FormatError, IntegrityError, IoResultExt};
use firmseal_header::HashAlgorithm;
use subtle::ConstantTimeEq;
use tracing::debug;

/// Patch magic.
pub const PATCH_MAGIC: &[u8; 8] = b"FSDELTA1";

const OP_END: u8 = 0x00;
const OP_COPY: u8 = 0x01;
const OP_INSERT: u8 = 0x02;

/// Shortest run worth encoding as a copy.
const MIN_MATCH: usize = 8;

/// Source positions remembered per 8-byte window.
const MAX_CANDIDATES: usize = 32;

const DIGEST_LEN: usize = 32;

/// Build a patch that turns `source` into `target`.
pub fn create_patch(source: &[u8], target: &[u8]) -> Vec<u8> {
    let mut index: HashMap<&[u8], Vec<usize>> = HashMap::new();
    for (pos, window) in source.windows(MIN_MATCH).enumerate() {
        let slots = index.entry(window).or_default();
        if slots.len() < MAX_CANDIDATES {
            slots.push(pos);
        }
    }

    let mut patch = Vec::new();
    patch.extend_from_slice(PATCH_MAGIC);
    patch.extend_from_slice(&(source.len() as u64).to_le_bytes());
    patch.extend_from_slice(&(target.len() as u64).to_le_bytes());
    patch.extend_from_slice(&HashAlgorithm::Sha256.digest(target));

    let mut copies = 0usize;
    let mut pos = 0usize;
    let mut literal_start = 0usize;
    while pos < target.len() {
        match longest_match(source, target, pos, &index) {
            Some((offset, len)) => {
                push_insert(&mut patch, target.get(literal_start..pos).unwrap_or_default());
                patch.push(OP_COPY);
                patch.extend_from_slice(&(offset as u64).to_le_bytes());
                patch.extend_from_slice(&(len as u64).to_le_bytes());
                copies = copies.saturating_add(1);
                pos = pos.saturating_add(len);
                literal_start = pos;
            }
            None => pos = pos.saturating_add(1),
        }
    }
    push_insert(&mut patch, target.get(literal_start..).unwrap_or_default());
    patch.push(OP_END);

    debug!(
        source_len = source.len(),
        target_len = target.len(),
        patch_len = patch.len(),
        copies,
        "Delta patch created"
    );
    patch
}

fn longest_match(
    source: &[u8],
    target: &[u8],
    pos: usize,
    index: &HashMap<&[u8], Vec<usize>>,
) -> Option<(usize, usize)> {
    let key = target.get(pos..pos.checked_add(MIN_MATCH)?)?;
    let wanted = target.get(pos..)?;
    index
        .get(key)?
        .iter()
        .filter_map(|&offset| {
            let available = source.get(offset..)?;
            let len = available
                .iter()
                .zip(wanted)
                .take_while(|(a, b)| a == b)
                .count();
            Some((offset, len))
        })
        .max_by_key(|&(offset, len)| (len, core::cmp::Reverse(offset)))
        .filter(|&(_, len)| len >= MIN_MATCH)
}

fn push_insert(patch: &mut Vec<u8>, literal: &[u8]) {
    if literal.is_empty() {
        return;
    }
    patch.push(OP_INSERT);
    patch.extend_from_slice(&(literal.len() as u64).to_le_bytes());
    patch.extend_from_slice(literal);
}

struct PatchReader<'a> {
    rest: &'a [u8],
    consumed: usize,
}

impl<'a> PatchReader<'a> {
    fn array<const N: usize>(&mut self, what: &'static str) -> Result<&'a [u8; N], FormatError> {
        let remaining: &'a [u8] = self.rest;
        let (head, rest) = remaining
            .split_first_chunk::<N>()
            .ok_or(FormatError::truncated(what, N, remaining.len()))?;
        self.rest = rest;
        self.consumed = self.consumed.saturating_add(N);
        Ok(head)
    }

    fn u64(&mut self, what: &'static str) -> Result<u64, FormatError> {
        self.array::<8>(what).map(|b| u64::from_le_bytes(*b))
    }

    fn length(&mut self, what: &'static str) -> Result<usize, FormatError> {
        let value = self.u64(what)?;
        usize::try_from(value)
            .map_err(|e| FormatError::Patch(format!("{what} {value} does not fit in memory: {e}")))
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8], FormatError> {
        let remaining: &'a [u8] = self.rest;
        let (head, rest) =
            remaining
                .split_at_checked(len)
                .ok_or(FormatError::DeclaredSizeExceedsBuffer {
                    field: "insert length",
                    declared: len as u64,
                    available: remaining.len() as u64,
                })?;
        self.rest = rest;
        self.consumed = self.consumed.saturating_add(len);
        Ok(head)
    }
}

/// Apply `patch` to `source`.
///
/// # Errors
///
/// Returns a format error for a malformed patch, and an integrity error if
/// `source` is not the file the patch was made from or the result does not
/// hash to the recorded target digest.
pub fn apply_patch(source: &[u8], patch: &[u8]) -> FirmSealResult<Vec<u8>> {
    let mut reader = PatchReader {
        rest: patch,
        consumed: 0,
    };

    let magic = reader.array::<8>("delta patch header")?;
    if magic != PATCH_MAGIC {
        return Err(FormatError::Patch(format!(
            "bad magic \"{}\"",
            magic.escape_ascii()
        ))
        .into());
    }
    let source_len = reader.u64("source length")?;
    let target_len = reader.length("target length")?;
    let digest = *reader.array::<DIGEST_LEN>("target digest")?;

    if source.len() as u64 != source_len {
        return Err(IntegrityError::SizeMismatch {
            subject: "delta source".to_string(),
            expected: source_len,
            actual: source.len() as u64,
        }
        .into());
    }

    let mut out = Vec::with_capacity(target_len.min(patch.len().saturating_mul(4)));
    loop {
        let [op] = *reader.array::<1>("delta op")?;
        match op {
            OP_END => break,
            OP_COPY => {
                let offset = reader.length("copy offset")?;
                let len = reader.length("copy length")?;
                let chunk = offset
                    .checked_add(len)
                    .and_then(|end| source.get(offset..end))
                    .ok_or(FormatError::DeclaredSizeExceedsBuffer {
                        field: "copy range",
                        declared: (offset as u64).saturating_add(len as u64),
                        available: source.len() as u64,
                    })?;
                out.extend_from_slice(chunk);
            }
            OP_INSERT => {
                let len = reader.length("insert length")?;
                out.extend_from_slice(reader.bytes(len)?);
            }
            other => {
                return Err(FormatError::Patch(format!(
                    "unknown op 0x{other:02X} at byte {}",
                    reader.consumed.saturating_sub(1)
                ))
                .into());
            }
        }
        if out.len() > target_len {
            return Err(FormatError::Patch(format!(
                "output exceeds the declared {target_len}-byte target"
            ))
            .into());
        }
    }

    if !reader.rest.is_empty() {
        return Err(FormatError::Patch(format!(
            "{} trailing bytes after the end marker",
            reader.rest.len()
        ))
        .into());
    }
    if out.len() != target_len {
        return Err(IntegrityError::SizeMismatch {
            subject: "delta target".to_string(),
            expected: target_len as u64,
            actual: out.len() as u64,
        }
        .into());
    }

    let actual = HashAlgorithm::Sha256.digest(&out);
    if !bool::from(actual.as_slice().ct_eq(&digest)) {
        return Err(
            IntegrityError::checksum("delta target", hex::encode(digest), hex::encode(actual))
                .into(),
        );
    }
    Ok(out)
}

/// Diff two files and write the patch to `output`, returning its length.
///
/// # Errors
///
/// Returns an I/O error if either input cannot be read or the patch
/// cannot be written.
pub fn create_patch_file(source: &Path, target: &Path, output: &Path) -> FirmSealResult<u64> {
    let old = std::fs::read(source).with_path(source)?;
    let new = std::fs::read(target).with_path(target)?;
    let patch = create_patch(&old, &new);
    std::fs::write(output, &patch).with_path(output)?;
    Ok(patch.len() as u64)
}
