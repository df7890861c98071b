//! Sidecar path naming.
//!
//! A sidecar lives next to its source and is named by appending
//! [`SIDECAR_SUFFIX`] to the source's full file name, extension included:
//! `report.pdf` -> `report.pdf.cabi.txt`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Suffix appended to a source path to form its sidecar path.
pub const SIDECAR_SUFFIX: &str = ".cabi.txt";

/// Sidecar path for a source path.
pub fn sidecar_path(source: &Path) -> PathBuf {
    let mut raw: OsString = source.as_os_str().to_owned();
    raw.push(SIDECAR_SUFFIX);
    PathBuf::from(raw)
}

/// Check if a path names a sidecar file.
///
/// Sidecars are never treated as sources.
pub fn is_sidecar(path: &Path) -> bool {
    path.file_name().is_some_and(|name| {
        name.as_encoded_bytes()
            .ends_with(SIDECAR_SUFFIX.as_bytes())
    })
}
