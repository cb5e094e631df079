//! HTTP server for grazer.
//!
//! This module implements the HTTP server that:
//! - Accepts invalidations from Neos and schedules reconciliations
//! - Provides a status endpoint for observability
//! - Provides health checks for liveness probes
//!
//! # Endpoints
//!
//! - `POST /api/revalidate` - Accepts invalidated documents (returns 200 OK)
//! - `GET /api/status` - Returns queue and worker counters as JSON
//! - `GET /health` - Returns 200 if server is running
//! - anything else - Logged at debug level, returns 200

use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::{debug, error};

use crate::clients::DocumentSource;
use crate::controller::Controller;
use crate::types::RoutePath;

pub mod auth;
pub mod fallback;
pub mod revalidate;
pub mod status;

pub use fallback::fallback_handler;
pub use revalidate::{RevalidateError, revalidate_handler};
pub use status::{StatusResponse, health_handler, status_handler};

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor. It owns the
/// controller and tracks the reconciliations spawned by inbound requests.
pub struct AppState<S> {
    inner: Arc<AppStateInner<S>>,
}

struct AppStateInner<S> {
    controller: Controller<S>,

    /// Shared secret expected in the `Authorization` header.
    revalidate_token: String,

    /// Reconciliations spawned by the revalidate endpoint.
    tasks: TaskTracker,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: DocumentSource> AppState<S> {
    pub fn new(controller: Controller<S>, revalidate_token: impl Into<String>) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                controller,
                revalidate_token: revalidate_token.into(),
                tasks: TaskTracker::new(),
            }),
        }
    }

    pub fn controller(&self) -> &Controller<S> {
        &self.inner.controller
    }

    pub fn revalidate_token(&self) -> &str {
        &self.inner.revalidate_token
    }

    /// Runs a reconciliation in the background.
    ///
    /// Failures are logged; the request that triggered it has already been
    /// answered.
    pub fn spawn_reconciliation(&self, route_paths: Vec<RoutePath>) {
        let controller = self.inner.controller.clone();
        self.inner.tasks.spawn(async move {
            if let Err(e) = controller.revalidate(route_paths).await {
                error!(error = %e, transient = e.is_transient(), "Revalidation failed");
            }
        });
    }

    /// Stops the drain worker, then waits for spawned reconciliations.
    pub async fn shutdown_and_wait(&self) {
        self.inner.controller.shutdown_and_wait().await;

        self.inner.tasks.close();
        debug!(pending = self.inner.tasks.len(), "Waiting for reconciliations");
        self.inner.tasks.wait().await;
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router<S: DocumentSource>(app_state: AppState<S>) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/api/revalidate", post(revalidate_handler::<S>))
        .route("/api/status", get(status_handler::<S>))
        .route("/health", get(health_handler))
        .fallback(fallback_handler)
        .with_state(app_state)
}
