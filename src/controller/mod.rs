//! Reconciliation and the revalidation worker.
//!
//! The [`Controller`] owns the revalidation queue and a single drain worker.
//! Every reconciliation fetches the full document inventory, enqueues it
//! together with the invalidated route paths, and wakes the worker.
//!
//! # Architecture
//!
//! ```text
//!  POST /api/revalidate ─┐
//!  initial delay ────────┼─► revalidate() ──► queue ──► wake ──► DrainWorker ──► sink
//!  cron schedules ───────┘   (serialized)
//! ```
//!
//! # Serialization
//!
//! Reconciliations hold a dedicated lock across "fetch inventory + enqueue",
//! so a slow reconciliation can never enqueue a stale inventory after a
//! fresher one. A second reconciliation waits; it is never dropped.
//!
//! # Shutdown
//!
//! [`Controller::shutdown_and_wait`] stops the worker before its next batch
//! and waits for a submission that is already in flight.

mod stats;
pub(crate) mod wake;
mod worker;


use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::clients::{ClientError, DocumentSource, RevalidationSink};
use crate::queue::{Generation, RevalidationQueue};
use crate::types::RoutePath;

pub use stats::{ControllerStats, StatsSnapshot};
use wake::{WakeSignal, wake_signal};
use worker::DrainWorker;

/// Errors surfaced by a reconciliation.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The inventory could not be fetched; nothing was enqueued.
    #[error("listing documents failed: {0}")]
    ListDocuments(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ControllerError {
    /// Returns true unless the source reports a permanent failure.
    pub fn is_transient(&self) -> bool {
        match self {
            ControllerError::ListDocuments(source) => source
                .downcast_ref::<ClientError>()
                .is_none_or(ClientError::is_transient),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    /// Maximum number of route paths per revalidation request.
    pub batch_size: NonZeroUsize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            batch_size: NonZeroUsize::MIN,
        }
    }
}

/// What a successful reconciliation enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub generation: Generation,
    /// Number of invalidated route paths in the request.
    pub invalidated: usize,
    /// Number of route paths in the fetched inventory.
    pub inventory: usize,
    /// Route paths newly added to the queue.
    pub inserted: usize,
    /// Backlog route paths promoted by this reconciliation.
    pub promoted: usize,
}

struct Inner<S> {
    queue: Arc<RevalidationQueue>,
    source: S,
    wake: WakeSignal,
    reconcile_lock: Mutex<()>,
    shutdown: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<ControllerStats>,
}

/// Handle to the reconciler and its drain worker. Cheap to clone.
pub struct Controller<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for Controller<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: DocumentSource> Controller<S> {
    /// Creates the controller and spawns its drain worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<R: RevalidationSink>(source: S, sink: R, config: ControllerConfig) -> Self {
        let queue = Arc::new(RevalidationQueue::new());
        let stats = Arc::new(ControllerStats::default());
        let shutdown = CancellationToken::new();
        let (wake, wake_rx) = wake_signal();

        let worker = DrainWorker {
            queue: Arc::clone(&queue),
            sink,
            batch_size: config.batch_size,
            wake: wake_rx,
            shutdown: shutdown.clone(),
            stats: Arc::clone(&stats),
        };
        let handle = tokio::spawn(worker.run());

        Self {
            inner: Arc::new(Inner {
                queue,
                source,
                wake,
                reconcile_lock: Mutex::new(()),
                shutdown,
                worker: Mutex::new(Some(handle)),
                stats,
            }),
        }
    }

    /// Reconciles the queue with the current inventory.
    ///
    /// Fetches every known route path, enqueues `invalidated` ahead of the
    /// inventory and wakes the worker. An empty `invalidated` list performs
    /// a background-only full refresh.
    ///
    /// If the fetch fails nothing is enqueued and the error is returned;
    /// retrying is up to the caller.
    #[instrument(skip_all, fields(invalidated = invalidated.len()))]
    pub async fn revalidate(
        &self,
        invalidated: Vec<RoutePath>,
    ) -> Result<ReconcileSummary, ControllerError> {
        let _guard = self.inner.reconcile_lock.lock().await;
        let start = Instant::now();
        debug!("Reconciliation started");

        let inventory = self
            .inner
            .source
            .list_documents()
            .await
            .map_err(|e| ControllerError::ListDocuments(Box::new(e)))?;

        debug!(
            invalidated_route_paths = ?invalidated,
            all_route_paths = ?inventory,
            "Enqueuing route paths"
        );
        let outcome = self.inner.queue.enqueue(&invalidated, &inventory);
        let woke = self.inner.wake.notify();

        info!(
            generation = %outcome.generation,
            inventory = inventory.len(),
            inserted = outcome.inserted,
            promoted = outcome.promoted,
            queued = self.inner.queue.len(),
            woke,
            duration_ms = start.elapsed().as_millis() as u64,
            "Reconciliation finished"
        );

        Ok(ReconcileSummary {
            generation: outcome.generation,
            invalidated: invalidated.len(),
            inventory: inventory.len(),
            inserted: outcome.inserted,
            promoted: outcome.promoted,
        })
    }

    /// Full refresh: reconciles with no invalidated route paths.
    pub async fn revalidate_all(&self) -> Result<ReconcileSummary, ControllerError> {
        self.revalidate(Vec::new()).await
    }
}

impl<S> Controller<S> {
    /// Stops the drain worker and waits for it to exit.
    ///
    /// Idempotent. Concurrent callers all return once the worker is gone.
    pub async fn shutdown_and_wait(&self) {
        self.inner.shutdown.cancel();

        let mut worker = self.inner.worker.lock().await;
        if let Some(handle) = worker.take()
            && let Err(e) = handle.await
        {
            error!(error = %e, "Drain worker terminated abnormally");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    pub fn queue(&self) -> &RevalidationQueue {
        &self.inner.queue
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }
}
