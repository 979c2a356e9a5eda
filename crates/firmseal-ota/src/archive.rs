//! Deterministic tar archives.
//!
//! Entries are regular files with GNU headers, mode 0644, uid/gid 0 and
//! mtime 0, written in the order given. No directory entries are emitted,
//! so identical inputs always produce identical bytes and the package
//! checksum can be recomputed from the manifest and payloads alone.

use std::io::Read;

use firmseal_errors::{FirmSealResult, FormatError};

/// Tar block size.
pub const BLOCK_SIZE: u64 = 512;

/// Two zero blocks terminate an archive.
pub const END_MARKER_LEN: u64 = 2 * BLOCK_SIZE;

/// One regular file read back from an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Entry path
    pub name: String,
    /// File contents
    pub data: Vec<u8>,
}

fn archive_error(context: &str, e: std::io::Error) -> FormatError {
    FormatError::Archive(format!("{context}: {e}"))
}

/// Build an archive from `(name, data)` pairs in order.
///
/// # Errors
///
/// Returns [`FormatError::Archive`] if a name cannot be encoded in a tar
/// header.
pub fn write_archive<'a, I>(entries: I) -> FirmSealResult<Vec<u8>>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut builder = tar::Builder::new(Vec::new());
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_uid(0);
        header.set_gid(0);
        header.set_mtime(0);
        header.set_cksum();
        builder
            .append_data(&mut header, name, data)
            .map_err(|e| archive_error(name, e))?;
    }
    Ok(builder
        .into_inner()
        .map_err(|e| archive_error("finishing archive", e))?)
}

/// Read every entry of an archive.
///
/// # Errors
///
/// Returns [`FormatError::Archive`] for corrupt headers, truncated data,
/// or any entry that is not a regular file.
pub fn read_archive(bytes: &[u8]) -> FirmSealResult<Vec<ArchiveEntry>> {
    let mut archive = tar::Archive::new(bytes);
    let mut out = Vec::new();
    for entry in archive
        .entries()
        .map_err(|e| archive_error("reading entries", e))?
    {
        let mut entry = entry.map_err(|e| archive_error("reading entry header", e))?;
        let name = entry
            .path()
            .map_err(|e| archive_error("decoding entry path", e))?
            .to_string_lossy()
            .into_owned();
        let entry_type = entry.header().entry_type();
        if entry_type != tar::EntryType::Regular {
            return Err(FormatError::Archive(format!(
                "entry '{name}' is {entry_type:?}, expected a regular file"
            ))
            .into());
        }
        let mut data = Vec::new();
        entry
            .read_to_end(&mut data)
            .map_err(|e| archive_error(&name, e))?;
        out.push(ArchiveEntry { name, data });
    }
    Ok(out)
}

/// Size of an archive holding entries of the given lengths.
///
/// Short names only; a name over 100 bytes adds a long-name entry.
pub fn archive_size(entry_lens: impl IntoIterator<Item = u64>) -> u64 {
    entry_lens
        .into_iter()
        .map(|len| BLOCK_SIZE.saturating_add(len.div_ceil(BLOCK_SIZE).saturating_mul(BLOCK_SIZE)))
        .fold(END_MARKER_LEN, u64::saturating_add)
}
