//! Error types for archive-watch
//!
//! This module provides error handling for the library:
//! - A top-level [`Error`] for configuration, watching, and I/O failures
//! - A domain-specific [`ExtractError`] for everything that can go wrong inside a
//!   single extraction job
//!
//! Extraction errors never escape a job. The dispatcher logs them and emits an
//! [`Event::ExtractionFailed`](crate::types::Event::ExtractionFailed), leaving the
//! archive in place.

use crate::types::ArchiveKind;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for archive-watch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for archive-watch
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "watch_dir")
        key: Option<String>,
    },

    /// Extraction job error
    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Folder watching error
    #[error("folder watch error: {0}")]
    FolderWatch(String),

    /// Shutdown in progress - not accepting new extraction jobs
    #[error("shutdown in progress: not accepting new extraction jobs")]
    ShuttingDown,
}

/// Errors raised while running a single extraction job
#[derive(Debug, Error)]
pub enum ExtractError {
    /// No extractor is registered for this archive kind
    #[error("no extractor available for {kind} archive {archive}")]
    ExtractorUnavailable {
        /// Archive kind that has no usable extractor
        kind: ArchiveKind,
        /// Archive that could not be processed
        archive: PathBuf,
    },

    /// The registered extractor executable does not exist
    #[error("extractor {tool} not found")]
    ToolMissing {
        /// Extractor executable that could not be started
        tool: PathBuf,
    },

    /// The decoder rejected the archive (corrupt, truncated, not an archive)
    #[error("extraction failed for {archive}: {reason}")]
    ExtractionFailed {
        /// Path to the archive that failed
        archive: PathBuf,
        /// Reason for failure
        reason: String,
    },

    /// External extractor exited with a non-zero status
    #[error("{tool} exited with {status} while extracting {archive}")]
    ToolFailed {
        /// Extractor executable
        tool: PathBuf,
        /// Archive being extracted
        archive: PathBuf,
        /// Exit status as reported by the OS
        status: String,
    },

    /// No free destination directory name could be found
    #[error("file collision at {path}: {reason}")]
    FileCollision {
        /// Default destination that collided
        path: PathBuf,
        /// Reason for failure
        reason: String,
    },

    /// Path cannot be turned into a destination directory
    #[error("invalid path {path}: {reason}")]
    InvalidPath {
        /// The problematic path
        path: PathBuf,
        /// Reason the path is invalid
        reason: String,
    },
}

impl Error {
    /// Build a configuration error for a specific key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_keeps_key_and_message() {
        let err = Error::config("watch_dir", "must not be empty");

        match &err {
            Error::Config { message, key } => {
                assert_eq!(message, "must not be empty");
                assert_eq!(key.as_deref(), Some("watch_dir"));
            }
            other => panic!("expected Config, got {other:?}"),
        }
        assert_eq!(err.to_string(), "configuration error: must not be empty");
    }

    #[test]
    fn extract_error_converts_into_error() {
        let err: Error = ExtractError::ExtractorUnavailable {
            kind: ArchiveKind::Rar,
            archive: PathBuf::from("/downloads/movie.rar"),
        }
        .into();

        assert!(matches!(
            err,
            Error::Extract(ExtractError::ExtractorUnavailable { .. })
        ));
        assert_eq!(
            err.to_string(),
            "extraction error: no extractor available for rar archive /downloads/movie.rar"
        );
    }

    #[test]
    fn tool_failure_message_names_tool_and_status() {
        let err = ExtractError::ToolFailed {
            tool: PathBuf::from("/usr/bin/unrar"),
            archive: PathBuf::from("a.rar"),
            status: "exit status: 3".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "/usr/bin/unrar exited with exit status: 3 while extracting a.rar"
        );
    }
}
