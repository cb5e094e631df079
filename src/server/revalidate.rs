//! Revalidate endpoint handler.
//!
//! Accepts invalidations from Neos, checks the bearer token, decodes the
//! document list and hands it to the controller on a tracked background
//! task. The response is sent before reconciliation starts, so a failed
//! reconciliation is only visible in the logs.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::AppState;
use super::auth::verify_bearer;
use crate::clients::DocumentSource;
use crate::types::DocumentList;

/// Errors that reject a revalidate request before it reaches the controller.
#[derive(Debug, Error)]
pub enum RevalidateError {
    /// Missing or wrong bearer token.
    #[error("invalid token")]
    InvalidToken,

    /// Body is not a document list.
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl IntoResponse for RevalidateError {
    fn into_response(self) -> Response {
        let status = match &self {
            RevalidateError::InvalidToken => StatusCode::FORBIDDEN,
            RevalidateError::InvalidJson(_) => StatusCode::BAD_REQUEST,
        };

        (status, self.to_string()).into_response()
    }
}

/// Revalidate handler.
///
/// # Request
///
/// - Method: POST
/// - Required headers:
///   - `Authorization`: `Bearer <revalidate token>`
/// - Body: `{"documents": [{"routePath": "/about"}, ...]}`
///
/// # Response
///
/// - 200 OK: Reconciliation scheduled
/// - 400 Bad Request: Body is not a document list
/// - 403 Forbidden: Missing or invalid token
pub async fn revalidate_handler<S: DocumentSource>(
    State(app_state): State<AppState<S>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), RevalidateError> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    // Check the token before looking at the body.
    if !verify_bearer(authorization, app_state.revalidate_token()) {
        warn!("Invalid token");
        return Err(RevalidateError::InvalidToken);
    }

    let list: DocumentList = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Failed to decode revalidate request body");
        RevalidateError::InvalidJson(e)
    })?;
    let route_paths = list.into_route_paths();

    info!(route_paths = ?route_paths, "Received revalidate request");

    app_state.spawn_reconciliation(route_paths);
    debug!("Reconciliation scheduled");

    Ok((StatusCode::OK, "OK"))
}
