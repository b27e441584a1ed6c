//! Configuration types for archive-watch

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// External tool paths used for archive kinds without a built-in decoder
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolsConfig {
    /// Path to unrar executable (auto-detected if None)
    #[serde(default)]
    pub unrar_path: Option<PathBuf>,

    /// Path to 7z executable (auto-detected if None)
    #[serde(default)]
    pub sevenzip_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            unrar_path: None,
            sevenzip_path: None,
            search_path: true,
        }
    }
}

/// Main configuration for the archive watcher
///
/// Constructed once by the embedding application (or loaded from a JSON file by
/// the `archive-watchd` binary) and passed into the service at construction.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Directory to watch for new archives (non-recursive)
    pub watch_dir: PathBuf,

    /// Quiet period before a burst of archives of one kind is extracted (default: 1s)
    #[serde(
        default = "default_debounce_delay",
        rename = "debounce_delay_ms",
        with = "duration_ms_serde"
    )]
    pub debounce_delay: Duration,

    /// Maximum number of archives extracted at the same time, across all kinds (default: 4)
    #[serde(default = "default_max_concurrent_extractions")]
    pub max_concurrent_extractions: usize,

    /// External tool paths
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch_dir: PathBuf::new(),
            debounce_delay: default_debounce_delay(),
            max_concurrent_extractions: default_max_concurrent_extractions(),
            tools: ToolsConfig::default(),
        }
    }
}

impl Config {
    /// Create a configuration watching `watch_dir` with default settings
    pub fn new(watch_dir: impl Into<PathBuf>) -> Self {
        Self {
            watch_dir: watch_dir.into(),
            ..Default::default()
        }
    }

    /// Load configuration from a JSON file
    ///
    /// Missing optional fields take their defaults. The result is validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(
                "config_file",
                format!("failed to read {}: {}", path.display(), e),
            )
        })?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.watch_dir.as_os_str().is_empty() {
            return Err(Error::config("watch_dir", "watch directory must be set"));
        }
        if self.max_concurrent_extractions == 0 {
            return Err(Error::config(
                "max_concurrent_extractions",
                "at least one concurrent extraction is required",
            ));
        }
        if self.debounce_delay.is_zero() {
            return Err(Error::config(
                "debounce_delay_ms",
                "debounce delay must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_debounce_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_concurrent_extractions() -> usize {
    4
}

// Duration serialization helper (milliseconds)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
