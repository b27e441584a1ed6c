//! # archive-watch
//!
//! Watches a download folder and unpacks every archive that lands in it.
//!
//! ## How it works
//!
//! - **Detection** - new files are classified by their leading bytes (ZIP, RAR,
//!   7z signatures), falling back to the file extension when the content is
//!   inconclusive
//! - **Debouncing** - arrivals of one archive kind are collected until the folder
//!   has been quiet for a moment, then handed over as one batch
//! - **Extraction** - each archive is unpacked into a fresh folder next to it,
//!   never into an existing one, on a pool with bounded concurrency
//! - **Cleanup** - the archive is deleted only after a successful extraction
//!
//! ## Quick Start
//!
//! ```no_run
//! use archive_watch::{ArchiveWatchService, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::new("/home/user/Downloads");
//!     let mut service = ArchiveWatchService::from_config(config)?;
//!
//!     // Subscribe to events
//!     let mut events = service.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     service.start()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Per-kind debouncing of ready archives
pub mod batcher;
/// Configuration types
pub mod config;
/// Bounded-concurrency extraction pool
pub mod dispatcher;
/// Error types
pub mod error;
/// Archive extraction
pub mod extraction;
/// Service lifecycle
pub mod service;
/// Content-based archive detection
pub mod sniffer;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;
/// Folder watching for new archives
pub mod watcher;

// Re-export commonly used types
pub use batcher::{BatchSink, DebounceBatcher};
pub use config::{Config, ToolsConfig};
pub use dispatcher::ExtractionDispatcher;
pub use error::{Error, ExtractError, Result};
pub use extraction::{ArchiveExtractor, ExtractorRegistry};
pub use service::ArchiveWatchService;
pub use sniffer::classify;
pub use types::{ArchiveKind, Detection, Event, ExtractionJob, ExtractionReport};

/// How long [`run_with_shutdown`] waits for running extractions after a signal
const SHUTDOWN_DRAIN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Helper function to run the service with graceful signal handling.
///
/// Starts the service, waits for a termination signal, stops watching, and then
/// gives running extractions up to 30 seconds to finish.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use archive_watch::{ArchiveWatchService, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::new("/srv/incoming");
///     let service = ArchiveWatchService::from_config(config)?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(service).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(mut service: ArchiveWatchService) -> Result<()> {
    service.start()?;
    let signal = wait_for_signal().await;
    tracing::info!(signal, "termination requested, stopping archive watcher");
    service.stop().await;
    if !service.drain(SHUTDOWN_DRAIN_TIMEOUT).await {
        tracing::warn!("Proceeding with shutdown while extractions are still running");
    }
    Ok(())
}

/// Wait for SIGTERM or SIGINT and return the name of the one received
///
/// Handler registration can fail in restricted environments (containers,
/// tests); whichever handler is available is used, then Ctrl+C.
#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        },
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "SIGINT handler unavailable, stopping on SIGTERM only");
            sigterm.recv().await;
            "SIGTERM"
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable, stopping on SIGINT only");
            sigint.recv().await;
            "SIGINT"
        }
        (Err(e), Err(_)) => {
            tracing::warn!(error = %e, "no signal handlers available, falling back to Ctrl+C");
            wait_for_ctrl_c().await
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for Ctrl+C, stopping immediately");
    }
    "Ctrl+C"
}
