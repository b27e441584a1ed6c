//! Core types for archive-watch

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Archive kind recognized by the watcher
///
/// Every kind is described by a row in a static table (extensions and byte
/// signatures), so supporting another format means adding a variant and its row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveKind {
    /// ZIP archive (.zip), extracted in-process
    Zip,
    /// RAR archive (.rar), extracted by an external tool
    Rar,
    /// 7-Zip archive (.7z), extracted by an external tool
    #[serde(rename = "7z")]
    SevenZip,
}

/// Static description of one archive kind
struct KindEntry {
    kind: ArchiveKind,
    name: &'static str,
    extensions: &'static [&'static str],
    signatures: &'static [&'static [u8]],
}

const KIND_TABLE: &[KindEntry] = &[
    KindEntry {
        kind: ArchiveKind::Zip,
        name: "zip",
        extensions: &["zip"],
        signatures: &[
            // local file header
            b"PK\x03\x04",
            // spanned archive marker
            b"PK\x07\x08",
        ],
    },
    KindEntry {
        kind: ArchiveKind::Rar,
        name: "rar",
        extensions: &["rar"],
        signatures: &[
            // RAR 1.5 - 4.x
            b"Rar!\x1A\x07\x00",
            // RAR 5.0
            b"Rar!\x1A\x07\x01\x00",
        ],
    },
    KindEntry {
        kind: ArchiveKind::SevenZip,
        name: "7z",
        extensions: &["7z"],
        signatures: &[b"7z\xBC\xAF\x27\x1C"],
    },
];

impl ArchiveKind {
    /// All supported kinds, in table order
    pub const ALL: [ArchiveKind; 3] = [ArchiveKind::Zip, ArchiveKind::Rar, ArchiveKind::SevenZip];

    fn entry(self) -> &'static KindEntry {
        // The table has exactly one row per variant, in declaration order
        &KIND_TABLE[self as usize]
    }

    /// Short lowercase name used in logs and events
    pub fn name(self) -> &'static str {
        self.entry().name
    }

    /// File extensions (lowercase, without the dot) that identify this kind
    pub fn extensions(self) -> &'static [&'static str] {
        self.entry().extensions
    }

    /// Leading byte signatures that identify this kind
    pub fn signatures(self) -> &'static [&'static [u8]] {
        self.entry().signatures
    }

    /// Look up a kind by file extension (case-insensitive, without the dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        KIND_TABLE
            .iter()
            .find(|entry| entry.extensions.contains(&ext.as_str()))
            .map(|entry| entry.kind)
    }

    /// Look up a kind by the leading bytes of a file
    pub fn from_signature(header: &[u8]) -> Option<Self> {
        KIND_TABLE
            .iter()
            .find(|entry| entry.signatures.iter().any(|sig| header.starts_with(sig)))
            .map(|entry| entry.kind)
    }

    /// Length of the longest signature across all kinds
    pub fn max_signature_len() -> usize {
        KIND_TABLE
            .iter()
            .flat_map(|entry| entry.signatures.iter())
            .map(|sig| sig.len())
            .max()
            .unwrap_or(0)
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a file's archive kind was determined
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Detection {
    /// Leading bytes matched a known signature
    Signature,
    /// Content was inconclusive; the file extension decided
    Extension,
}

/// A single archive handed to the extraction pool
///
/// The destination folder is deliberately not part of the job: it is resolved
/// inside the job, immediately before extraction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractionJob {
    /// Absolute path of the archive
    pub archive: PathBuf,
    /// Archive kind the batch was collected under
    pub kind: ArchiveKind,
}

impl ExtractionJob {
    /// Create a new job
    pub fn new(archive: impl Into<PathBuf>, kind: ArchiveKind) -> Self {
        Self {
            archive: archive.into(),
            kind,
        }
    }
}

/// Outcome of a successful extraction job
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Archive that was extracted
    pub archive: PathBuf,
    /// Folder the archive was extracted into
    pub destination: PathBuf,
    /// Whether the source archive was deleted afterwards
    pub source_removed: bool,
}

/// Event emitted while watching and extracting
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A new file in the watch folder was classified as an archive
    ArchiveDetected {
        /// Archive kind
        kind: ArchiveKind,
        /// Path of the detected file
        path: PathBuf,
        /// How the kind was determined
        detection: Detection,
    },

    /// A debounced batch was handed to the extraction pool
    BatchDispatched {
        /// Archive kind of the batch
        kind: ArchiveKind,
        /// Number of archives in the batch
        count: usize,
    },

    /// A pending batch was dropped because the watcher stopped
    BatchDiscarded {
        /// Archive kind of the batch
        kind: ArchiveKind,
        /// Number of archives that were never extracted
        count: usize,
    },

    /// Extraction of an archive started
    ExtractionStarted {
        /// Archive kind
        kind: ArchiveKind,
        /// Archive being extracted
        archive: PathBuf,
        /// Destination folder
        destination: PathBuf,
    },

    /// Extraction of an archive finished successfully
    ExtractionComplete {
        /// Archive kind
        kind: ArchiveKind,
        /// Archive that was extracted
        archive: PathBuf,
        /// Destination folder
        destination: PathBuf,
    },

    /// Extraction of an archive failed; the archive was left in place
    ExtractionFailed {
        /// Archive kind
        kind: ArchiveKind,
        /// Archive that failed
        archive: PathBuf,
        /// Error message
        error: String,
    },

    /// Source archive deleted after successful extraction
    ArchiveRemoved {
        /// Path of the deleted archive
        path: PathBuf,
    },

    /// The service stopped watching
    Shutdown,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_rows_match_variant_order() {
        for kind in ArchiveKind::ALL {
            assert_eq!(kind.entry().kind, kind, "row for {kind:?} is out of order");
        }
    }

    #[test]
    fn from_extension_is_case_insensitive() {
        assert_eq!(ArchiveKind::from_extension("zip"), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::from_extension("ZIP"), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::from_extension("Rar"), Some(ArchiveKind::Rar));
        assert_eq!(ArchiveKind::from_extension("7Z"), Some(ArchiveKind::SevenZip));
        assert_eq!(ArchiveKind::from_extension("txt"), None);
        assert_eq!(ArchiveKind::from_extension(""), None);
    }

    #[test]
    fn from_signature_matches_every_table_signature() {
        for kind in ArchiveKind::ALL {
            for sig in kind.signatures() {
                let mut header = sig.to_vec();
                header.extend_from_slice(b"trailing");
                assert_eq!(ArchiveKind::from_signature(&header), Some(kind));
            }
        }
    }

    #[test]
    fn from_signature_rejects_truncated_signatures() {
        assert_eq!(ArchiveKind::from_signature(b"PK\x03"), None);
        assert_eq!(ArchiveKind::from_signature(b"Rar!\x1A\x07"), None);
        assert_eq!(ArchiveKind::from_signature(b""), None);
    }

    #[test]
    fn rar5_header_is_not_mistaken_for_rar4() {
        // RAR4 signature ends in 0x00 at offset 6, RAR5 has 0x01 there
        assert_eq!(
            ArchiveKind::from_signature(b"Rar!\x1A\x07\x01\x00"),
            Some(ArchiveKind::Rar)
        );
        assert_eq!(ArchiveKind::from_signature(b"Rar!\x1A\x07\x02\x00"), None);
    }

    #[test]
    fn max_signature_len_covers_rar5() {
        assert_eq!(ArchiveKind::max_signature_len(), 8);
    }

    #[test]
    fn kind_serializes_with_short_names() {
        assert_eq!(serde_json::to_string(&ArchiveKind::Zip).unwrap(), "\"zip\"");
        assert_eq!(
            serde_json::to_string(&ArchiveKind::SevenZip).unwrap(),
            "\"7z\""
        );
        let kind: ArchiveKind = serde_json::from_str("\"rar\"").unwrap();
        assert_eq!(kind, ArchiveKind::Rar);
    }

    #[test]
    fn event_is_tagged_by_type() {
        let event = Event::BatchDispatched {
            kind: ArchiveKind::Zip,
            count: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "batch_dispatched");
        assert_eq!(json["kind"], "zip");
        assert_eq!(json["count"], 3);
    }
}
