//! Archive fixtures and watch-folder setup

use archive_watch::{ArchiveWatchService, Config, ExtractorRegistry};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Debounce used by integration tests, short enough to keep tests fast
pub const TEST_DEBOUNCE: Duration = Duration::from_millis(300);

/// Leading bytes of a RAR5 archive
pub const RAR5_HEADER: &[u8] = b"Rar!\x1A\x07\x01\x00";

/// Write a stored (uncompressed) ZIP archive containing `files`
pub fn create_zip_archive(archive_path: &Path, files: &[(&str, &[u8])]) {
    let file = std::fs::File::create(archive_path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
}

/// Temporary layout: a watch folder plus a staging folder on the same filesystem
pub struct WatchFolder {
    /// Keeps the directories alive for the duration of the test
    pub temp: TempDir,
    /// Folder the service watches
    pub watch: PathBuf,
    /// Folder where files are prepared before being moved in
    pub staging: PathBuf,
}

impl WatchFolder {
    /// Create the temporary layout; the watch folder itself is left to the service
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let watch = temp.path().join("watch");
        let staging = temp.path().join("staging");
        std::fs::create_dir(&staging).unwrap();
        Self {
            temp,
            watch,
            staging,
        }
    }

    /// Service configuration for this folder
    pub fn config(&self) -> Config {
        Config {
            debounce_delay: TEST_DEBOUNCE,
            max_concurrent_extractions: 2,
            ..Config::new(&self.watch)
        }
    }

    /// Started service with only the built-in extractors
    pub fn start_service(&self) -> ArchiveWatchService {
        let mut service =
            ArchiveWatchService::new(self.config(), ExtractorRegistry::builtin()).unwrap();
        service.start().unwrap();
        service
    }

    /// Write a ZIP in the staging folder, then rename it into the watch folder
    ///
    /// Mirrors how browsers finish a download. Returns the final path.
    pub fn drop_zip(&self, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
        let staged = self.staging.join(name);
        create_zip_archive(&staged, files);
        self.move_in(&staged, name)
    }

    /// Place arbitrary bytes in the watch folder via the staging folder
    pub fn drop_bytes(&self, name: &str, content: &[u8]) -> PathBuf {
        let staged = self.staging.join(name);
        std::fs::write(&staged, content).unwrap();
        self.move_in(&staged, name)
    }

    fn move_in(&self, staged: &Path, name: &str) -> PathBuf {
        let target = self.watch.join(name);
        std::fs::rename(staged, &target).unwrap();
        target
    }
}
