//! Per-kind debouncing of archive arrivals
//!
//! A multi-volume download or a browser saving several files at once produces a
//! burst of creation events within milliseconds. The batcher coalesces such a
//! burst into a single hand-off per archive kind:
//!
//! ```text
//! Idle --file ready--> Accumulating --quiet period elapsed--> Dispatching --> Idle
//!                        ^        |
//!                        +--------+ file ready (timer re-armed)
//! ```
//!
//! Each kind is served by its own actor task that exclusively owns its pending
//! paths and deadline. Paths arrive over a channel, so kinds never wait on each
//! other and no lock guards the pending state.

use crate::types::{ArchiveKind, Event};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Receiver of debounced batches
///
/// Implementations must return promptly; long-running work belongs on their own
/// tasks. The batch is handed over by value and never shared with the batcher.
#[async_trait]
pub trait BatchSink: Send + Sync + 'static {
    /// Accept a batch of archive paths, in arrival order
    async fn dispatch(&self, kind: ArchiveKind, paths: Vec<PathBuf>);
}

/// Coarse state of one kind's pending batch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchState {
    /// No pending paths, no timer
    Idle,
    /// At least one pending path, timer armed
    Accumulating,
}

/// Pending paths for one archive kind plus the deadline of its quiet period
#[derive(Debug, Default)]
pub struct PendingBatch {
    paths: Vec<PathBuf>,
    deadline: Option<Instant>,
}

impl PendingBatch {
    /// Record a ready file and re-arm the deadline to `now + delay`
    ///
    /// A path already pending is not added twice, but still re-arms the timer.
    /// Returns whether the path was appended.
    pub fn push(&mut self, path: PathBuf, now: Instant, delay: Duration) -> bool {
        self.deadline = Some(now + delay);
        if self.paths.contains(&path) {
            return false;
        }
        self.paths.push(path);
        true
    }

    /// Deadline of the armed timer, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Take ownership of the pending paths, leaving the batch idle
    pub fn take(&mut self) -> Vec<PathBuf> {
        self.deadline = None;
        std::mem::take(&mut self.paths)
    }

    /// Number of pending paths
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether no paths are pending
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Current state of the batch
    pub fn state(&self) -> BatchState {
        if self.deadline.is_some() {
            BatchState::Accumulating
        } else {
            BatchState::Idle
        }
    }
}

/// Coalesces bursts of ready archives into one dispatch per kind
pub struct DebounceBatcher {
    senders: HashMap<ArchiveKind, mpsc::UnboundedSender<PathBuf>>,
    cancel: CancellationToken,
    actors: TaskTracker,
}

impl DebounceBatcher {
    /// Spawn one batching actor per archive kind
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        delay: Duration,
        sink: Arc<dyn BatchSink>,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let actors = TaskTracker::new();
        let mut senders = HashMap::new();

        for kind in ArchiveKind::ALL {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.insert(kind, tx);
            actors.spawn(run_actor(
                kind,
                delay,
                rx,
                sink.clone(),
                cancel.clone(),
                event_tx.clone(),
            ));
        }
        actors.close();

        debug!(?delay, "debounce batcher started");

        Self {
            senders,
            cancel,
            actors,
        }
    }

    /// Queue a classified archive and restart that kind's quiet period
    pub fn on_file_ready(&self, kind: ArchiveKind, path: PathBuf) {
        let Some(tx) = self.senders.get(&kind) else {
            return;
        };
        if let Err(e) = tx.send(path) {
            debug!(%kind, path = ?e.0, "batcher stopped, ignoring ready file");
        }
    }

    /// Cancel all armed timers and wait for the actors to exit
    ///
    /// Pending batches are discarded. Batches already handed to the sink are
    /// unaffected.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.actors.wait().await;
        debug!("debounce batcher stopped");
    }
}

impl Drop for DebounceBatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_actor(
    kind: ArchiveKind,
    delay: Duration,
    mut rx: mpsc::UnboundedReceiver<PathBuf>,
    sink: Arc<dyn BatchSink>,
    cancel: CancellationToken,
    event_tx: broadcast::Sender<Event>,
) {
    let mut batch = PendingBatch::default();
    let timer = tokio::time::sleep(delay);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            received = rx.recv() => {
                let Some(path) = received else { break };
                if !batch.push(path, Instant::now(), delay) {
                    debug!(%kind, "duplicate ready event, timer re-armed");
                }
                if let Some(deadline) = batch.deadline() {
                    timer.as_mut().reset(deadline);
                }
            }
            _ = &mut timer, if batch.state() == BatchState::Accumulating => {
                let paths = batch.take();
                info!(%kind, count = paths.len(), "quiet period elapsed, dispatching batch");
                sink.dispatch(kind, paths).await;
            }
        }
    }

    if !batch.is_empty() {
        let count = batch.len();
        warn!(%kind, count, "discarding pending batch on shutdown");
        event_tx.send(Event::BatchDiscarded { kind, count }).ok();
    }
}
