//! Health and status endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use super::AppState;
use crate::clients::DocumentSource;
use crate::controller::StatsSnapshot;
use crate::queue::Generation;

/// Liveness probe. Returns 200 OK with the text "OK".
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Body of `GET /api/status`.
///
/// ```text
/// {"queued": 12, "generation": 4, "shuttingDown": false,
///  "drainPasses": 3, "batchesSubmitted": 40, "batchesFailed": 1,
///  "routePathsSubmitted": 40}
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Route paths waiting in the queue.
    pub queued: usize,
    /// Generation of the most recent reconciliation.
    pub generation: Generation,
    pub shutting_down: bool,
    #[serde(flatten)]
    pub stats: StatsSnapshot,
}

pub async fn status_handler<S: DocumentSource>(
    State(app_state): State<AppState<S>>,
) -> Json<StatusResponse> {
    let controller = app_state.controller();
    let queue = controller.queue();

    Json(StatusResponse {
        queued: queue.len(),
        generation: queue.generation(),
        shutting_down: controller.is_shut_down(),
        stats: controller.stats(),
    })
}
