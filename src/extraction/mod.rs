//! Archive extraction backends
//!
//! This module maps every [`ArchiveKind`] to the thing that knows how to unpack it.
//!
//! ## Architecture
//!
//! The core abstraction is the [`ArchiveExtractor`] trait. Two implementations are
//! provided:
//!
//! - [`ZipExtractor`]: built-in ZIP decoder, runs in-process on a blocking thread
//! - [`CommandExtractor`]: runs an external tool (`unrar`, `7z`, or any program
//!   taking `<archive> <destination>`) and waits for it to exit
//!
//! The [`ExtractorRegistry`] is the lookup table from kind to extractor. It is built
//! once at startup and shared read-only afterwards.
//!
//! ## Usage
//!
//! ```no_run
//! use archive_watch::config::ToolsConfig;
//! use archive_watch::extraction::ExtractorRegistry;
//! use archive_watch::types::ArchiveKind;
//!
//! let registry = ExtractorRegistry::from_tools(&ToolsConfig::default());
//! if registry.get(ArchiveKind::Rar).is_none() {
//!     println!("RAR archives will be left alone: no unrar or 7z found");
//! }
//! ```

mod command;
mod zip;

pub use command::{ArgLayout, CommandExtractor};
pub use self::zip::ZipExtractor;

use crate::config::ToolsConfig;
use crate::error::Result;
use crate::types::ArchiveKind;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Trait for unpacking one archive into an existing, empty destination folder
#[async_trait]
pub trait ArchiveExtractor: Send + Sync {
    /// Extract `archive` into `dest`
    ///
    /// `dest` already exists and was created for this call alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive is corrupt or incomplete, the tool is
    /// missing, or the tool exits unsuccessfully.
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;

    /// Short name of this extractor, for logs
    fn name(&self) -> &'static str;
}

/// Lookup table from archive kind to extractor
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: BTreeMap<ArchiveKind, Arc<dyn ArchiveExtractor>>,
}

impl ExtractorRegistry {
    /// Registry with no extractors at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with only the built-in ZIP extractor
    pub fn builtin() -> Self {
        Self::empty().with_extractor(ArchiveKind::Zip, ZipExtractor)
    }

    /// Register (or replace) the extractor for a kind
    #[must_use]
    pub fn with_extractor(
        mut self,
        kind: ArchiveKind,
        extractor: impl ArchiveExtractor + 'static,
    ) -> Self {
        self.extractors.insert(kind, Arc::new(extractor));
        self
    }

    /// Build the registry from tool configuration
    ///
    /// Explicit paths win. Otherwise, when `search_path` is enabled, `unrar` and
    /// `7z` (or `7zz`, `7za`) are looked up on PATH. RAR archives use `unrar` when
    /// available and fall back to `7z`, which also reads RAR.
    pub fn from_tools(tools: &ToolsConfig) -> Self {
        let unrar = resolve_tool(tools.unrar_path.as_deref(), &["unrar"], tools.search_path);
        let sevenzip = resolve_tool(
            tools.sevenzip_path.as_deref(),
            &["7z", "7zz", "7za"],
            tools.search_path,
        );

        let mut registry = Self::builtin();

        match (&unrar, &sevenzip) {
            (Some(path), _) => {
                registry = registry.with_extractor(
                    ArchiveKind::Rar,
                    CommandExtractor::new(path.clone(), ArgLayout::Unrar),
                );
            }
            (None, Some(path)) => {
                registry = registry.with_extractor(
                    ArchiveKind::Rar,
                    CommandExtractor::new(path.clone(), ArgLayout::SevenZip),
                );
            }
            (None, None) => {}
        }

        if let Some(path) = sevenzip {
            registry = registry.with_extractor(
                ArchiveKind::SevenZip,
                CommandExtractor::new(path, ArgLayout::SevenZip),
            );
        }

        for kind in ArchiveKind::ALL {
            match registry.get(kind) {
                Some(extractor) => info!(%kind, extractor = extractor.name(), "extractor registered"),
                None => warn!(%kind, "no extractor available, archives of this kind will be left in place"),
            }
        }

        registry
    }

    /// Extractor registered for a kind, if any
    pub fn get(&self, kind: ArchiveKind) -> Option<Arc<dyn ArchiveExtractor>> {
        self.extractors.get(&kind).cloned()
    }

    /// Kinds that have an extractor
    pub fn kinds(&self) -> impl Iterator<Item = ArchiveKind> + '_ {
        self.extractors.keys().copied()
    }
}

impl fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.extractors.iter().map(|(kind, e)| (kind, e.name())))
            .finish()
    }
}

/// Resolve an external tool: explicit path first, then PATH candidates
fn resolve_tool(explicit: Option<&Path>, candidates: &[&str], search_path: bool) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if !path.exists() {
            warn!(?path, "configured extractor does not exist, jobs using it will fail");
        }
        return Some(path.to_path_buf());
    }

    if !search_path {
        return None;
    }

    candidates.iter().find_map(|name| which::which(name).ok())
}
