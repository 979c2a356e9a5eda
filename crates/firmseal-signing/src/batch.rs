//! Input discovery for directory batch runs.

use std::path::{Path, PathBuf};

use firmseal_errors::{FirmSealError, FirmSealResult};
use walkdir::WalkDir;

/// Regular files directly inside `dir` whose names match the glob `pattern`,
/// sorted by name.
///
/// # Errors
///
/// Returns a configuration error for an invalid pattern and an I/O error if
/// the directory cannot be listed.
pub fn collect_inputs(dir: &Path, pattern: &str) -> FirmSealResult<Vec<PathBuf>> {
    let matcher = glob::Pattern::new(pattern)
        .map_err(|e| FirmSealError::config(format!("invalid file pattern '{pattern}': {e}")))?;

    let mut inputs = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            FirmSealError::io(path, e.into())
        })?;
        if entry.file_type().is_file() && matcher.matches(&entry.file_name().to_string_lossy()) {
            inputs.push(entry.into_path());
        }
    }
    Ok(inputs)
}

/// `<output_dir>/<stem>_signed<.ext>` for a batch input.
///
/// # Errors
///
/// Returns a configuration error if `input` has no file name.
pub fn signed_output_path(input: &Path, output_dir: &Path) -> FirmSealResult<PathBuf> {
    let stem = input
        .file_stem()
        .ok_or_else(|| FirmSealError::config(format!("{} has no file name", input.display())))?;

    let mut name = stem.to_os_string();
    name.push("_signed");
    if let Some(ext) = input.extension() {
        name.push(".");
        name.push(ext);
    }
    Ok(output_dir.join(name))
}
