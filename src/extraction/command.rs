//! External extractor invoked as a child process

use crate::error::{ExtractError, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::ArchiveExtractor;

/// How archive and destination are passed to an external tool
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgLayout {
    /// `<tool> <archive> <destination>`
    Plain,
    /// `unrar x -y <archive> <destination>/`
    ///
    /// unrar treats a trailing path separator as "extract here", anything else as
    /// a file mask.
    Unrar,
    /// `7z x -y <archive> -o<destination>`
    SevenZip,
}

/// Extractor that shells out to an external program
///
/// # Examples
///
/// ```no_run
/// use archive_watch::extraction::{ArchiveExtractor, ArgLayout, CommandExtractor};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let unrar = CommandExtractor::new("/usr/bin/unrar", ArgLayout::Unrar);
/// unrar
///     .extract(Path::new("/downloads/movie.rar"), Path::new("/downloads/movie"))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct CommandExtractor {
    program: PathBuf,
    layout: ArgLayout,
}

impl CommandExtractor {
    /// Create an extractor for an explicit program path
    pub fn new(program: impl Into<PathBuf>, layout: ArgLayout) -> Self {
        Self {
            program: program.into(),
            layout,
        }
    }

    /// Program that will be executed
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Command-line arguments for one extraction
    pub fn args(&self, archive: &Path, dest: &Path) -> Vec<OsString> {
        match self.layout {
            ArgLayout::Plain => vec![archive.into(), dest.into()],
            ArgLayout::Unrar => {
                let mut dest_arg = OsString::from(dest);
                dest_arg.push(std::path::MAIN_SEPARATOR_STR);
                vec!["x".into(), "-y".into(), archive.into(), dest_arg]
            }
            ArgLayout::SevenZip => {
                let mut out_arg = OsString::from("-o");
                out_arg.push(dest);
                vec!["x".into(), "-y".into(), archive.into(), out_arg]
            }
        }
    }
}

#[async_trait]
impl ArchiveExtractor for CommandExtractor {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        let args = self.args(archive, dest);
        debug!(program = ?self.program, ?args, "running external extractor");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    ExtractError::ToolMissing {
                        tool: self.program.clone(),
                    }
                } else {
                    ExtractError::ExtractionFailed {
                        archive: archive.to_path_buf(),
                        reason: format!("failed to execute {}: {}", self.program.display(), e),
                    }
                }
            })?;

        if !output.status.success() {
            debug!(
                program = ?self.program,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "external extractor reported failure"
            );
            return Err(ExtractError::ToolFailed {
                tool: self.program.clone(),
                archive: archive.to_path_buf(),
                status: output.status.to_string(),
            }
            .into());
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        match self.layout {
            ArgLayout::Plain => "command",
            ArgLayout::Unrar => "unrar",
            ArgLayout::SevenZip => "7z",
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn plain_layout_passes_archive_then_destination() {
        let extractor = CommandExtractor::new("/bin/extract", ArgLayout::Plain);
        let args = extractor.args(Path::new("/in/a.rar"), Path::new("/in/a"));

        assert_eq!(args, vec![OsString::from("/in/a.rar"), OsString::from("/in/a")]);
    }

    #[test]
    fn unrar_layout_marks_destination_as_directory() {
        let extractor = CommandExtractor::new("unrar", ArgLayout::Unrar);
        let args = extractor.args(Path::new("/in/a.rar"), Path::new("/in/a"));

        let expected_dest = format!("/in/a{}", std::path::MAIN_SEPARATOR);
        assert_eq!(
            args,
            vec![
                OsString::from("x"),
                OsString::from("-y"),
                OsString::from("/in/a.rar"),
                OsString::from(expected_dest),
            ]
        );
    }

    #[test]
    fn sevenzip_layout_uses_output_switch() {
        let extractor = CommandExtractor::new("7z", ArgLayout::SevenZip);
        let args = extractor.args(Path::new("/in/a.7z"), Path::new("/in/a"));

        assert_eq!(args[0], "x");
        assert_eq!(args[3], "-o/in/a");
    }

    #[tokio::test]
    async fn missing_program_is_tool_missing() {
        let extractor =
            CommandExtractor::new("/nonexistent/archive-watch-extractor-xyz", ArgLayout::Plain);

        let err = extractor
            .extract(Path::new("/in/a.rar"), Path::new("/in/a"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Extract(ExtractError::ToolMissing { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_tool_failure() {
        let extractor = CommandExtractor::new("false", ArgLayout::Plain);

        let err = extractor
            .extract(Path::new("/in/a.rar"), Path::new("/in/a"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Extract(ExtractError::ToolFailed { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn zero_exit_is_success() {
        let extractor = CommandExtractor::new("true", ArgLayout::Plain);

        extractor
            .extract(Path::new("/in/a.rar"), Path::new("/in/a"))
            .await
            .unwrap();
    }
}
