//! Run counters of the drain worker.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct ControllerStats {
    drain_passes: AtomicU64,
    batches_submitted: AtomicU64,
    batches_failed: AtomicU64,
    route_paths_submitted: AtomicU64,
}

/// Point-in-time copy of [`ControllerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub drain_passes: u64,
    pub batches_submitted: u64,
    pub batches_failed: u64,
    pub route_paths_submitted: u64,
}

impl ControllerStats {
    pub(crate) fn record_drain_pass(&self) {
        self.drain_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_submitted(&self, route_paths: usize) {
        self.batches_submitted.fetch_add(1, Ordering::Relaxed);
        self.route_paths_submitted
            .fetch_add(route_paths as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            drain_passes: self.drain_passes.load(Ordering::Relaxed),
            batches_submitted: self.batches_submitted.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            route_paths_submitted: self.route_paths_submitted.load(Ordering::Relaxed),
        }
    }
}
