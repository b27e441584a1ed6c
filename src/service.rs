//! Service wiring: watcher, batcher, and dispatcher behind one handle

use crate::batcher::DebounceBatcher;
use crate::config::Config;
use crate::dispatcher::ExtractionDispatcher;
use crate::error::{Error, Result};
use crate::extraction::ExtractorRegistry;
use crate::types::Event;
use crate::watcher::FileWatcher;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Watches a folder and extracts every archive that lands in it
///
/// Construction only validates configuration; nothing runs until
/// [`start`](Self::start). Once stopped, a service cannot be restarted.
pub struct ArchiveWatchService {
    config: Arc<Config>,
    dispatcher: ExtractionDispatcher,
    /// Event broadcast channel sender (multiple subscribers supported)
    event_tx: broadcast::Sender<Event>,
    active: Option<Active>,
    stopped: bool,
}

/// Components that only exist while the service is watching
struct Active {
    watcher: FileWatcher,
    batcher: Arc<DebounceBatcher>,
}

impl ArchiveWatchService {
    /// Create a service with an explicit extractor registry
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn new(config: Config, registry: ExtractorRegistry) -> Result<Self> {
        config.validate()?;

        // Create broadcast channel with buffer size of 1000 events
        let (event_tx, _rx) = broadcast::channel(1000);
        let dispatcher = ExtractionDispatcher::new(
            Arc::new(registry),
            config.max_concurrent_extractions,
            event_tx.clone(),
        );

        Ok(Self {
            config: Arc::new(config),
            dispatcher,
            event_tx,
            active: None,
            stopped: false,
        })
    }

    /// Create a service whose extractors are discovered from `config.tools`
    pub fn from_config(config: Config) -> Result<Self> {
        let registry = ExtractorRegistry::from_tools(&config.tools);
        Self::new(config, registry)
    }

    /// Subscribe to service events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Current configuration
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Whether the folder is being watched
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Extraction jobs spawned but not yet finished
    pub fn pending_jobs(&self) -> usize {
        self.dispatcher.pending_jobs()
    }

    /// Start watching the configured folder
    ///
    /// Must be called from within a tokio runtime. Starting a running service is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShuttingDown`] after [`stop`](Self::stop), or
    /// [`Error::FolderWatch`] if the folder cannot be watched.
    pub fn start(&mut self) -> Result<()> {
        if self.stopped {
            return Err(Error::ShuttingDown);
        }
        if self.active.is_some() {
            return Ok(());
        }

        let batcher = Arc::new(DebounceBatcher::spawn(
            self.config.debounce_delay,
            Arc::new(self.dispatcher.clone()),
            self.event_tx.clone(),
        ));
        let mut watcher = FileWatcher::new(
            self.config.watch_dir.clone(),
            batcher.clone(),
            self.event_tx.clone(),
        );
        // On failure the batcher is dropped, which stops its actors
        watcher.start()?;

        tracing::info!(
            watch_dir = ?self.config.watch_dir,
            debounce_delay = ?self.config.debounce_delay,
            max_concurrent_extractions = self.config.max_concurrent_extractions,
            "archive watch service started"
        );
        self.active = Some(Active { watcher, batcher });
        Ok(())
    }

    /// Stop watching
    ///
    /// Unsubscribes from the folder, discards batches still waiting for their
    /// quiet period, and rejects further batches. Extractions already running
    /// continue in the background; use [`drain`](Self::drain) to wait for them.
    pub async fn stop(&mut self) {
        if self.stopped {
            return;
        }
        tracing::info!("Stopping archive watch service");

        if let Some(mut active) = self.active.take() {
            active.watcher.stop().await;
            active.batcher.shutdown().await;
        }
        self.dispatcher.close();
        self.stopped = true;

        self.event_tx.send(Event::Shutdown).ok();
        tracing::info!(
            pending_jobs = self.dispatcher.pending_jobs(),
            "archive watch service stopped"
        );
    }

    /// Wait up to `timeout` for in-flight extractions to finish
    ///
    /// Returns `true` if every job finished in time. Closes the dispatcher, so
    /// it is meant for shutdown.
    pub async fn drain(&self, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.dispatcher.drain()).await {
            Ok(()) => {
                tracing::info!("All extraction jobs completed");
                true
            }
            Err(_) => {
                tracing::warn!(
                    pending_jobs = self.dispatcher.pending_jobs(),
                    "Timeout waiting for extraction jobs to complete"
                );
                false
            }
        }
    }
}
