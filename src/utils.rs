//! Utility functions for destination folder naming

use crate::error::{ExtractError, Result};
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Maximum number of rename attempts when resolving folder collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Default extraction folder for an archive: the archive path without its extension
///
/// # Examples
///
/// ```
/// use archive_watch::utils::default_destination;
/// use std::path::Path;
///
/// let dest = default_destination(Path::new("/downloads/photos.zip")).unwrap();
/// assert_eq!(dest, Path::new("/downloads/photos"));
/// ```
pub fn default_destination(archive: &Path) -> Result<PathBuf> {
    let stem = archive.file_stem().ok_or_else(|| ExtractError::InvalidPath {
        path: archive.to_path_buf(),
        reason: "Cannot extract file stem".to_string(),
    })?;

    Ok(archive.with_file_name(stem))
}

/// Candidate name for the `index`-th attempt: `name`, then `name (2)`, `name (3)`, ...
fn candidate(path: &Path, name: &OsStr, index: u32) -> PathBuf {
    if index == 1 {
        return path.to_path_buf();
    }
    let mut numbered = name.to_os_string();
    numbered.push(format!(" ({})", index));
    path.with_file_name(numbered)
}

/// Create a fresh directory at `path`, or at the first free `path (N)` sibling
///
/// Each attempt is a single atomic `create_dir`, so two jobs racing for the same
/// name can never both win it. Existing entries, whether directories or files,
/// are never touched. Only `AlreadyExists` moves on to the next candidate; any
/// other failure (missing parent, permissions) is returned immediately.
///
/// Returns the path of the directory that was created.
pub async fn create_unique_dir(path: &Path) -> Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| ExtractError::InvalidPath {
        path: path.to_path_buf(),
        reason: "Cannot extract directory name".to_string(),
    })?;

    for index in 1..=MAX_RENAME_ATTEMPTS {
        let attempt = candidate(path, name, index);
        match tokio::fs::create_dir(&attempt).await {
            Ok(()) => return Ok(attempt),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(ExtractError::FileCollision {
        path: path.to_path_buf(),
        reason: format!(
            "Could not find unique folder name after {} attempts",
            MAX_RENAME_ATTEMPTS
        ),
    }
    .into())
}
