//! archive-watchd: watch a folder and unpack archives as they arrive
//!
//! Logging is controlled with `RUST_LOG` (default `info`).

use archive_watch::{ArchiveWatchService, Config, run_with_shutdown};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "archive-watchd", version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Folder to watch, overrides the configuration file
    #[arg(short, long)]
    watch_dir: Option<PathBuf>,

    /// Quiet period in milliseconds before a burst of archives is extracted
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Maximum number of simultaneous extractions
    #[arg(long)]
    workers: Option<usize>,
}

impl Args {
    fn into_config(self) -> archive_watch::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(dir) = self.watch_dir {
            config.watch_dir = dir;
        }
        if let Some(ms) = self.debounce_ms {
            config.debounce_delay = Duration::from_millis(ms);
        }
        if let Some(workers) = self.workers {
            config.max_concurrent_extractions = workers;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Only fails if a global subscriber is already set
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match Args::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let service = match ArchiveWatchService::from_config(config) {
        Ok(service) => service,
        Err(e) => {
            tracing::error!(error = %e, "failed to create service");
            return ExitCode::FAILURE;
        }
    };

    match run_with_shutdown(service).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "archive watcher failed");
            ExitCode::FAILURE
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let args = Args::parse_from([
            "archive-watchd",
            "--watch-dir",
            "/srv/in",
            "--debounce-ms",
            "250",
            "--workers",
            "2",
        ]);

        let config = args.into_config().unwrap();
        assert_eq!(config.watch_dir, PathBuf::from("/srv/in"));
        assert_eq!(config.debounce_delay, Duration::from_millis(250));
        assert_eq!(config.max_concurrent_extractions, 2);
    }

    #[test]
    fn missing_watch_dir_is_rejected() {
        let args = Args::parse_from(["archive-watchd"]);
        assert!(args.into_config().is_err());
    }
}
