//! Folder watching for archive arrivals
//!
//! Subscribes to OS notifications for a single directory (non-recursive) and
//! forwards every new file that looks like an archive to the
//! [`DebounceBatcher`]. A file counts as new when it is created in the folder or
//! renamed into it; browsers and download managers usually finish a download by
//! renaming a temporary file.
//!
//! # Example
//!
//! ```no_run
//! use archive_watch::batcher::DebounceBatcher;
//! use archive_watch::dispatcher::ExtractionDispatcher;
//! use archive_watch::extraction::ExtractorRegistry;
//! use archive_watch::watcher::FileWatcher;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio::sync::broadcast;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (event_tx, _) = broadcast::channel(1000);
//! let dispatcher = ExtractionDispatcher::new(
//!     Arc::new(ExtractorRegistry::builtin()),
//!     4,
//!     event_tx.clone(),
//! );
//! let batcher = Arc::new(DebounceBatcher::spawn(
//!     Duration::from_secs(1),
//!     Arc::new(dispatcher),
//!     event_tx.clone(),
//! ));
//!
//! let mut watcher = FileWatcher::new("/home/user/Downloads", batcher, event_tx);
//! watcher.start()?;
//! // ...
//! watcher.stop().await;
//! # Ok(())
//! # }
//! ```

use crate::batcher::DebounceBatcher;
use crate::error::{Error, Result};
use crate::sniffer;
use crate::types::Event;
use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Config as NotifyConfig, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Watches one folder and feeds new archives to the batcher
pub struct FileWatcher {
    watch_dir: PathBuf,
    router: Arc<EventRouter>,
    running: Option<Running>,
}

/// Live OS subscription plus the task draining its events
struct Running {
    watcher: RecommendedWatcher,
    task: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Turns raw filesystem notifications into ready archives
struct EventRouter {
    batcher: Arc<DebounceBatcher>,
    event_tx: broadcast::Sender<Event>,
}

impl FileWatcher {
    /// Create a watcher for `watch_dir`; nothing is observed until [`start`](Self::start)
    pub fn new(
        watch_dir: impl Into<PathBuf>,
        batcher: Arc<DebounceBatcher>,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            watch_dir: watch_dir.into(),
            router: Arc::new(EventRouter { batcher, event_tx }),
            running: None,
        }
    }

    /// Directory being watched
    pub fn watch_dir(&self) -> &Path {
        &self.watch_dir
    }

    /// Whether the OS subscription is active
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Subscribe to notifications for the watch directory
    ///
    /// Creates the directory if it does not exist. Calling `start` on a running
    /// watcher is a no-op. Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created or watched
    pub fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Ok(());
        }

        if !self.watch_dir.exists() {
            std::fs::create_dir_all(&self.watch_dir).map_err(|e| {
                Error::FolderWatch(format!("Failed to create watch folder: {}", e))
            })?;
            info!("Created watch folder: {}", self.watch_dir.display());
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<notify::Event>>();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                // Receiver is gone once the watcher is stopping
                let _ = tx.send(res);
            },
            NotifyConfig::default(),
        )
        .map_err(|e| Error::FolderWatch(e.to_string()))?;

        watcher
            .watch(&self.watch_dir, RecursiveMode::NonRecursive)
            .map_err(|e| Error::FolderWatch(format!("Failed to watch folder: {}", e)))?;

        let cancel = CancellationToken::new();
        let router = self.router.clone();
        let loop_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    received = rx.recv() => match received {
                        Some(Ok(event)) => {
                            let router = router.clone();
                            let routed =
                                tokio::task::spawn_blocking(move || router.handle_event(event));
                            if let Err(e) = routed.await {
                                error!(error = %e, "routing filesystem event panicked");
                            }
                        }
                        Some(Err(e)) => error!(error = %e, "filesystem watcher error"),
                        None => break,
                    },
                    _ = loop_cancel.cancelled() => break,
                }
            }
            debug!("watch event loop exited");
        });

        info!("Watching folder: {}", self.watch_dir.display());
        self.running = Some(Running {
            watcher,
            task,
            cancel,
        });
        Ok(())
    }

    /// Unsubscribe and wait for the event loop to finish
    ///
    /// Events already delivered by the OS are still routed before the loop
    /// exits. Calling `stop` on a stopped watcher is a no-op.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        // Dropping the watcher ends the OS subscription
        drop(running.watcher);
        running.cancel.cancel();
        if let Err(e) = running.task.await {
            error!(error = %e, "watch event loop panicked");
        }

        info!("Stopped watching folder: {}", self.watch_dir.display());
    }
}

impl EventRouter {
    /// Route one notification
    ///
    /// Only arrivals matter: file creation and renames into the folder.
    /// Deletions, metadata changes, and content writes are ignored.
    ///
    /// Blocking: stats candidate paths and reads archive headers, so the event
    /// loop runs it on the blocking pool.
    fn handle_event(&self, event: notify::Event) {
        match event.kind {
            EventKind::Create(CreateKind::Folder) => {}
            EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                for path in &event.paths {
                    self.consider(path);
                }
            }
            // paths are [from, to]
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                if let Some(path) = event.paths.last() {
                    self.consider(path);
                }
            }
            // Platforms that cannot tell the two sides of a rename apart report
            // both paths this way; only the one that still exists arrived
            EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => {
                for path in event.paths.iter().filter(|p| p.exists()) {
                    self.consider(path);
                }
            }
            _ => {}
        }
    }

    fn consider(&self, path: &Path) {
        if path.is_dir() {
            return;
        }

        if sniffer::kind_from_extension(path).is_none() {
            debug!(?path, "ignoring file without archive extension");
            return;
        }

        let Some((kind, detection)) = sniffer::classify_detailed(path) else {
            return;
        };

        debug!(?path, %kind, ?detection, "archive detected");
        let _ = self.event_tx.send(Event::ArchiveDetected {
            kind,
            path: path.to_path_buf(),
            detection,
        });
        self.batcher.on_file_ready(kind, path.to_path_buf());
    }
}
