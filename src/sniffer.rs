//! Content-based archive detection
//!
//! Classifies a file by its leading bytes rather than its name. When the content
//! is inconclusive (file still being written, locked, empty, or simply not
//! matching any signature) the lowercase file extension decides instead, so an
//! in-flight download is not dropped just because its header has not landed yet.
//!
//! The two checks are OR-ed: a file named `notes.zip` containing plain text is
//! still classified as [`ArchiveKind::Zip`]. Extraction then fails for it and the
//! file is left alone.

use crate::types::{ArchiveKind, Detection};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::trace;

/// Classify a file as an archive kind
///
/// Never fails: read errors count as "inconclusive" and fall back to the extension.
pub fn classify(path: &Path) -> Option<ArchiveKind> {
    classify_detailed(path).map(|(kind, _)| kind)
}

/// Classify a file and report how the kind was determined
pub fn classify_detailed(path: &Path) -> Option<(ArchiveKind, Detection)> {
    if let Some(kind) = read_header(path)
        .as_deref()
        .and_then(ArchiveKind::from_signature)
    {
        return Some((kind, Detection::Signature));
    }

    kind_from_extension(path).map(|kind| (kind, Detection::Extension))
}

/// Archive kind implied by the file extension alone
pub fn kind_from_extension(path: &Path) -> Option<ArchiveKind> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(ArchiveKind::from_extension)
}

/// Read up to the longest signature length from the start of the file
///
/// Returns `None` when the file cannot be opened or read. A short file yields
/// whatever bytes are available.
fn read_header(path: &Path) -> Option<Vec<u8>> {
    let len = ArchiveKind::max_signature_len() as u64;
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            trace!(?path, error = %e, "header not readable, treating as inconclusive");
            return None;
        }
    };

    let mut header = Vec::with_capacity(len as usize);
    match file.take(len).read_to_end(&mut header) {
        Ok(_) => Some(header),
        Err(e) => {
            trace!(?path, error = %e, "header read failed, treating as inconclusive");
            None
        }
    }
}
