//! Catch-all handler.
//!
//! Logs every request that matches no route at debug level and answers
//! `200 OK`. Useful while wiring up Neos or Next.js webhooks against a
//! fresh deployment.

use axum::body::to_bytes;
use axum::extract::Request;
use axum::http::{HeaderMap, StatusCode, header};
use tracing::{Level, debug, enabled};

/// Largest body that is read for logging.
const MAX_LOGGED_BODY: usize = 64 * 1024;

pub async fn fallback_handler(request: Request) -> StatusCode {
    if !enabled!(Level::DEBUG) {
        return StatusCode::OK;
    }

    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, MAX_LOGGED_BODY).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => format!("<unreadable body: {e}>"),
    };

    debug!(
        method = %parts.method,
        uri = %parts.uri,
        headers = ?redacted(&parts.headers),
        body = %body,
        "Unhandled request"
    );

    StatusCode::OK
}

fn redacted(headers: &HeaderMap) -> Vec<(&str, &str)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if *name == header::AUTHORIZATION {
                "[redacted]"
            } else {
                value.to_str().unwrap_or("<binary>")
            };
            (name.as_str(), value)
        })
        .collect()
}
