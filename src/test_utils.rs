//! Shared test doubles and arbitrary generators for property-based testing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use proptest::prelude::*;
use thiserror::Error;
use tokio::sync::{Notify, Semaphore};

use crate::clients::{DocumentSource, RevalidationSink};
use crate::types::RoutePath;

pub fn arb_route_path() -> impl Strategy<Value = RoutePath> {
    prop_oneof![
        Just(RoutePath::new("/")),
        "/[a-e]{1,3}(/[a-c]{1,2})?".prop_map(RoutePath::new),
    ]
}

pub fn paths(items: &[&str]) -> Vec<RoutePath> {
    items.iter().map(|s| RoutePath::new(*s)).collect()
}

/// Polls `done` until it holds, failing the test after two seconds.
pub async fn eventually(mut done: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[derive(Debug, Error)]
#[error("mock failure: {0}")]
pub struct MockError(pub String);

// ─── Document source ───

#[derive(Default)]
struct SourceInner {
    route_paths: Mutex<Vec<RoutePath>>,
    fail: AtomicBool,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Mutex<Option<Duration>>,
}

/// Document source returning a fixed inventory.
#[derive(Clone, Default)]
pub struct StaticSource {
    inner: Arc<SourceInner>,
}

impl StaticSource {
    pub fn new(route_paths: &[&str]) -> Self {
        let source = Self::default();
        source.set_route_paths(route_paths);
        source
    }

    pub fn set_route_paths(&self, route_paths: &[&str]) {
        *self.inner.route_paths.lock().unwrap() = paths(route_paths);
    }

    pub fn set_failing(&self, fail: bool) {
        self.inner.fail.store(fail, Ordering::SeqCst);
    }

    /// Makes every listing take `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.inner.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Highest number of listings that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }
}

impl DocumentSource for StaticSource {
    type Error = MockError;

    async fn list_documents(&self) -> Result<Vec<RoutePath>, Self::Error> {
        let inner = &self.inner;
        inner.calls.fetch_add(1, Ordering::SeqCst);
        let running = inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        inner.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = *inner.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        if inner.fail.load(Ordering::SeqCst) {
            return Err(MockError("inventory unavailable".to_string()));
        }
        Ok(inner.route_paths.lock().unwrap().clone())
    }
}

// ─── Revalidation sink ───

#[derive(Default)]
struct SinkInner {
    started: Mutex<Vec<Vec<RoutePath>>>,
    completed: Mutex<Vec<Vec<RoutePath>>>,
    fail: AtomicBool,
    gate: Option<Semaphore>,
    on_start: Notify,
}

/// Sink recording every batch it receives.
///
/// A gated sink blocks each submission until [`RecordingSink::release`]
/// hands out a permit.
#[derive(Clone, Default)]
pub struct RecordingSink {
    inner: Arc<SinkInner>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> Self {
        Self {
            inner: Arc::new(SinkInner {
                gate: Some(Semaphore::new(0)),
                ..SinkInner::default()
            }),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.inner.fail.store(fail, Ordering::SeqCst);
    }

    /// Lets `n` gated submissions complete.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.inner.gate {
            gate.add_permits(n);
        }
    }

    /// Waits until a submission has started since the last call.
    pub async fn wait_started(&self) {
        self.inner.on_start.notified().await;
    }

    pub fn started(&self) -> Vec<Vec<RoutePath>> {
        self.inner.started.lock().unwrap().clone()
    }

    pub fn completed(&self) -> Vec<Vec<RoutePath>> {
        self.inner.completed.lock().unwrap().clone()
    }

    /// Every completed route path, flattened in submission order.
    pub fn submitted_route_paths(&self) -> Vec<String> {
        self.completed()
            .into_iter()
            .flatten()
            .map(|route_path| route_path.0)
            .collect()
    }
}

impl RevalidationSink for RecordingSink {
    type Error = MockError;

    async fn revalidate(&self, route_paths: &[RoutePath]) -> Result<(), Self::Error> {
        let inner = &self.inner;
        inner.started.lock().unwrap().push(route_paths.to_vec());
        inner.on_start.notify_one();

        if let Some(gate) = &inner.gate {
            gate.acquire()
                .await
                .map_err(|_| MockError("gate closed".to_string()))?
                .forget();
        }

        if inner.fail.load(Ordering::SeqCst) {
            return Err(MockError("revalidation rejected".to_string()));
        }
        inner.completed.lock().unwrap().push(route_paths.to_vec());
        Ok(())
    }
}
