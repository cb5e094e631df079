//! Error type shared by the outbound HTTP clients.
//!
//! Errors are classified as transient or permanent. Nothing retries based on
//! the classification; it is attached as the `transient` field when a failed
//! reconciliation is logged.
//!
//! - **Transient**: timeouts, connection failures, HTTP 429 and 5xx
//! - **Permanent**: invalid URLs, other non-success statuses, undecodable bodies

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status code {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    /// Returns true if repeating the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Request { source, .. } => source.is_timeout() || source.is_connect(),
            ClientError::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
            ClientError::Build(_) | ClientError::InvalidUrl { .. } | ClientError::Decode { .. } => {
                false
            }
        }
    }
}
