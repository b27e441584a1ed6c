//! Bounded-concurrency extraction of debounced batches
//!
//! Every archive in a batch becomes its own job. Jobs share one semaphore, so no
//! more than `max_concurrent_extractions` archives are unpacked at once across
//! all kinds. A job owns its archive from start to finish:
//!
//! 1. look up the extractor for the kind (abandon the job if there is none)
//! 2. wait for a permit
//! 3. create a fresh destination folder next to the archive
//! 4. extract into it
//! 5. delete the archive, only if extraction succeeded
//!
//! A failing job never affects its siblings. Failures are logged and broadcast as
//! [`Event::ExtractionFailed`]; the archive is left where it was.

use crate::batcher::BatchSink;
use crate::error::{Error, ExtractError, Result};
use crate::extraction::ExtractorRegistry;
use crate::types::{ArchiveKind, Event, ExtractionJob, ExtractionReport};
use crate::utils::{create_unique_dir, default_destination};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Semaphore, broadcast};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Runs extraction jobs on a bounded pool
#[derive(Clone)]
pub struct ExtractionDispatcher {
    registry: Arc<ExtractorRegistry>,
    permits: Arc<Semaphore>,
    jobs: TaskTracker,
    accepting: Arc<AtomicBool>,
    event_tx: broadcast::Sender<Event>,
}

impl ExtractionDispatcher {
    /// Create a dispatcher allowing `max_concurrent` simultaneous extractions
    pub fn new(
        registry: Arc<ExtractorRegistry>,
        max_concurrent: usize,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            registry,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            jobs: TaskTracker::new(),
            accepting: Arc::new(AtomicBool::new(true)),
            event_tx,
        }
    }

    /// Spawn one job per archive in the batch
    ///
    /// Returns the number of jobs spawned. Jobs run in the background; their
    /// outcome is reported through events and logs only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShuttingDown`] after [`close`](Self::close).
    pub fn run(&self, kind: ArchiveKind, paths: Vec<PathBuf>) -> Result<usize> {
        if !self.is_accepting() {
            return Err(Error::ShuttingDown);
        }

        let count = paths.len();
        info!(%kind, count, "dispatching extraction batch");

        for archive in paths {
            let dispatcher = self.clone();
            let job = ExtractionJob::new(archive, kind);
            self.jobs.spawn(async move {
                // Failures are already logged and broadcast by execute
                let _ = dispatcher.execute(job).await;
            });
        }

        let _ = self.event_tx.send(Event::BatchDispatched { kind, count });
        Ok(count)
    }

    /// Run a single job to completion
    ///
    /// Waits for a pool permit like any dispatched job. Emits
    /// [`Event::ExtractionFailed`] on error.
    pub async fn execute(&self, job: ExtractionJob) -> Result<ExtractionReport> {
        match self.try_execute(&job).await {
            Ok(report) => Ok(report),
            Err(e) => {
                warn!(
                    archive = ?job.archive,
                    kind = %job.kind,
                    error = %e,
                    "extraction abandoned, archive left in place"
                );
                let _ = self.event_tx.send(Event::ExtractionFailed {
                    kind: job.kind,
                    archive: job.archive.clone(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn try_execute(&self, job: &ExtractionJob) -> Result<ExtractionReport> {
        let extractor = self
            .registry
            .get(job.kind)
            .ok_or_else(|| ExtractError::ExtractorUnavailable {
                kind: job.kind,
                archive: job.archive.clone(),
            })?;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::ShuttingDown)?;

        // Resolved only now, so jobs queued behind the semaphore see folders
        // created by the jobs that ran before them
        let wanted = default_destination(&job.archive)?;
        let destination = create_unique_dir(&wanted).await?;
        if destination != wanted {
            debug!(?wanted, ?destination, "default destination taken");
        }

        info!(
            archive = ?job.archive,
            ?destination,
            extractor = extractor.name(),
            "extracting archive"
        );
        let _ = self.event_tx.send(Event::ExtractionStarted {
            kind: job.kind,
            archive: job.archive.clone(),
            destination: destination.clone(),
        });

        if let Err(e) = extractor.extract(&job.archive, &destination).await {
            remove_if_empty(&destination).await;
            return Err(e);
        }

        let source_removed = match tokio::fs::remove_file(&job.archive).await {
            Ok(()) => {
                let _ = self.event_tx.send(Event::ArchiveRemoved {
                    path: job.archive.clone(),
                });
                true
            }
            Err(e) => {
                warn!(archive = ?job.archive, error = %e, "extracted but could not delete archive");
                false
            }
        };

        info!(archive = ?job.archive, ?destination, "extraction complete");
        let _ = self.event_tx.send(Event::ExtractionComplete {
            kind: job.kind,
            archive: job.archive.clone(),
            destination: destination.clone(),
        });

        Ok(ExtractionReport {
            archive: job.archive.clone(),
            destination,
            source_removed,
        })
    }

    /// Stop accepting new batches; jobs already spawned keep running
    pub fn close(&self) {
        if self.accepting.swap(false, Ordering::SeqCst) {
            self.jobs.close();
            info!("stopped accepting new extraction jobs");
        }
    }

    /// Whether new batches are accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Number of spawned jobs that have not finished yet
    pub fn pending_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Close the dispatcher and wait until every spawned job has finished
    pub async fn drain(&self) {
        self.close();
        self.jobs.wait().await;
    }
}

#[async_trait]
impl BatchSink for ExtractionDispatcher {
    async fn dispatch(&self, kind: ArchiveKind, paths: Vec<PathBuf>) {
        let count = paths.len();
        if let Err(e) = self.run(kind, paths) {
            warn!(%kind, count, error = %e, "batch rejected");
        }
    }
}

/// Remove a destination folder created for a failed job, unless it holds files
async fn remove_if_empty(dir: &Path) {
    // remove_dir refuses non-empty directories, so partial output is kept
    match tokio::fs::remove_dir(dir).await {
        Ok(()) => debug!(?dir, "removed empty destination after failure"),
        Err(e) => debug!(?dir, error = %e, "keeping destination after failure"),
    }
}
