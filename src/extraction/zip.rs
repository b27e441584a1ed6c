use crate::error::{Error, ExtractError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

use super::ArchiveExtractor;

/// Built-in extractor for ZIP files
#[derive(Clone, Copy, Debug, Default)]
pub struct ZipExtractor;

impl ZipExtractor {
    /// Extract a single ZIP entry to disk, creating directories as needed
    fn extract_zip_entry(
        mut file: zip::read::ZipFile,
        dest_path: &Path,
        archive_path: &Path,
    ) -> Result<Option<PathBuf>> {
        let file_path = match file.enclosed_name() {
            Some(path) => dest_path.join(path),
            None => {
                warn!(?archive_path, entry = file.name(), "skipping entry with unsafe path");
                return Ok(None);
            }
        };

        if file.is_dir() {
            std::fs::create_dir_all(&file_path)?;
            return Ok(None);
        }

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut outfile = std::fs::File::create(&file_path)?;
        std::io::copy(&mut file, &mut outfile).map_err(|e| {
            Error::Extract(ExtractError::ExtractionFailed {
                archive: archive_path.to_path_buf(),
                reason: format!("failed to extract {}: {}", file_path.display(), e),
            })
        })?;

        Ok(Some(file_path))
    }

    /// Extract every entry of a ZIP archive into `dest_path`
    ///
    /// Blocking; call from a blocking thread.
    pub fn extract_all(archive_path: &Path, dest_path: &Path) -> Result<Vec<PathBuf>> {
        debug!(?archive_path, ?dest_path, "attempting ZIP extraction");

        let file = std::fs::File::open(archive_path)?;

        let mut archive = zip::ZipArchive::new(file).map_err(|e| {
            Error::Extract(ExtractError::ExtractionFailed {
                archive: archive_path.to_path_buf(),
                reason: format!("failed to read ZIP archive: {}", e),
            })
        })?;

        let mut extracted_files = Vec::new();

        for i in 0..archive.len() {
            let entry = archive.by_index(i).map_err(|e| {
                Error::Extract(ExtractError::ExtractionFailed {
                    archive: archive_path.to_path_buf(),
                    reason: format!("failed to read ZIP entry: {}", e),
                })
            })?;

            if let Some(file_path) = Self::extract_zip_entry(entry, dest_path, archive_path)? {
                extracted_files.push(file_path);
            }
        }

        info!(
            ?archive_path,
            extracted_count = extracted_files.len(),
            "ZIP extraction successful"
        );

        Ok(extracted_files)
    }
}

#[async_trait]
impl ArchiveExtractor for ZipExtractor {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        let archive_owned = archive.to_path_buf();
        let dest_owned = dest.to_path_buf();

        spawn_blocking(move || Self::extract_all(&archive_owned, &dest_owned))
            .await
            .map_err(|e| {
                Error::Extract(ExtractError::ExtractionFailed {
                    archive: archive.to_path_buf(),
                    reason: format!("extraction task panicked: {}", e),
                })
            })??;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "zip"
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_zip_archive(archive_path: &Path, files: &[(&str, &[u8])]) {
        let file = std::fs::File::create(archive_path).unwrap();
        let mut writer = ::zip::ZipWriter::new(file);
        let options = ::zip::write::FileOptions::default()
            .compression_method(::zip::CompressionMethod::Stored);
        for (name, content) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }

    #[tokio::test]
    async fn extracts_nested_entries() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("bundle.zip");
        let dest = temp.path().join("bundle");
        std::fs::create_dir(&dest).unwrap();
        create_zip_archive(
            &archive,
            &[("readme.txt", b"hello"), ("docs/guide.md", b"# guide")],
        );

        ZipExtractor.extract(&archive, &dest).await.unwrap();

        assert_eq!(std::fs::read(dest.join("readme.txt")).unwrap(), b"hello");
        assert_eq!(
            std::fs::read(dest.join("docs").join("guide.md")).unwrap(),
            b"# guide"
        );
    }

    #[test]
    fn extract_all_reports_written_files() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("two.zip");
        let dest = temp.path().join("out");
        std::fs::create_dir(&dest).unwrap();
        create_zip_archive(&archive, &[("a.txt", b"a"), ("b.txt", b"b")]);

        let files = ZipExtractor::extract_all(&archive, &dest).unwrap();

        assert_eq!(files, vec![dest.join("a.txt"), dest.join("b.txt")]);
    }

    #[test]
    fn traversal_entries_are_skipped() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("evil.zip");
        let dest = temp.path().join("evil");
        std::fs::create_dir(&dest).unwrap();
        create_zip_archive(&archive, &[("../escape.txt", b"x"), ("safe.txt", b"y")]);

        let files = ZipExtractor::extract_all(&archive, &dest).unwrap();

        assert_eq!(files, vec![dest.join("safe.txt")]);
        assert!(!temp.path().join("escape.txt").exists());
    }

    #[tokio::test]
    async fn empty_file_is_extraction_failure() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("bogus.zip");
        std::fs::write(&archive, b"").unwrap();
        let dest = temp.path().join("bogus");
        std::fs::create_dir(&dest).unwrap();

        let err = ZipExtractor.extract(&archive, &dest).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Extract(ExtractError::ExtractionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn missing_archive_is_io_error() {
        let temp = TempDir::new().unwrap();
        let err = ZipExtractor
            .extract(&temp.path().join("gone.zip"), temp.path())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Io(_)));
    }
}
