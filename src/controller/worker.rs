//! The drain worker.
//!
//! A single long-lived task that sleeps until woken, then pops batches from
//! the queue and submits them to the sink until the queue is empty.
//!
//! ```text
//!            wake                 queue empty
//!   Idle ──────────► Draining ─────────────────► Idle
//!     │                  │
//!     └──── shutdown ────┴──► Stopped
//! ```
//!
//! Shutdown is checked before every batch. A submission that is already in
//! flight is allowed to finish; the remaining queue is left undrained.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::clients::RevalidationSink;
use crate::queue::RevalidationQueue;
use crate::types::RoutePath;

use super::stats::ControllerStats;
use super::wake::WakeReceiver;

/// How a drain pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DrainEnd {
    /// The queue ran empty.
    Empty,
    /// Shutdown was requested between batches.
    Cancelled,
}

pub(crate) struct DrainWorker<R> {
    pub queue: Arc<RevalidationQueue>,
    pub sink: R,
    pub batch_size: NonZeroUsize,
    pub wake: WakeReceiver,
    pub shutdown: CancellationToken,
    pub stats: Arc<ControllerStats>,
}

impl<R: RevalidationSink> DrainWorker<R> {
    #[instrument(name = "drain_worker", skip_all, fields(batch_size = self.batch_size.get()))]
    pub async fn run(mut self) {
        debug!("Drain worker started");

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    debug!("Returning from run loop");
                    break;
                }

                wake = self.wake.recv() => {
                    if wake.is_none() {
                        debug!("Wake channel closed, returning from run loop");
                        break;
                    }
                    if self.drain().await == DrainEnd::Cancelled {
                        debug!("Returning from run loop, stopped processing the queue");
                        break;
                    }
                }
            }
        }

        self.wake.close();
        info!(remaining = self.queue.len(), "Drain worker stopped");
    }

    /// Pops and submits batches until the queue is empty or shutdown is requested.
    pub(crate) async fn drain(&self) -> DrainEnd {
        self.stats.record_drain_pass();

        loop {
            if self.shutdown.is_cancelled() {
                return DrainEnd::Cancelled;
            }

            let batch = self.queue.pop_batch(self.batch_size.get());
            if batch.is_empty() {
                debug!("Queue is empty, stop processing");
                return DrainEnd::Empty;
            }

            self.submit(&batch).await;
        }
    }

    async fn submit(&self, batch: &[RoutePath]) {
        info!(route_paths = ?batch, "Sending revalidate request");
        let start = Instant::now();

        // TODO: re-enqueue batches that failed with a transient error once
        // the queue can rank them behind fresh invalidations.
        match self.sink.revalidate(batch).await {
            Ok(()) => self.stats.record_submitted(batch.len()),
            Err(e) => {
                self.stats.record_failed();
                error!(route_paths = ?batch, error = %e, "Revalidate failed");
            }
        }

        debug!(
            route_paths = ?batch,
            duration_ms = start.elapsed().as_millis() as u64,
            "Revalidate finished"
        );
    }
}
