//! Next.js revalidation client.
//!
//! Sends `POST {url}` with `Authorization: Bearer <token>` and the route
//! paths as a document list. Only `200 OK` counts as success.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::debug;

use crate::types::{DocumentList, RoutePath};

use super::{ClientError, RevalidationSink};

/// Default timeout for a revalidation request.
pub const DEFAULT_REVALIDATE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct NextRevalidatorConfig {
    /// Revalidation endpoint of the Next.js app.
    pub url: String,

    /// Shared secret sent as bearer token.
    pub token: String,

    pub timeout: Duration,
}

impl std::fmt::Debug for NextRevalidatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NextRevalidatorConfig")
            .field("url", &self.url)
            .field("token", &"[redacted]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Client for the Next.js revalidation endpoint.
#[derive(Clone)]
pub struct NextRevalidator {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl std::fmt::Debug for NextRevalidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NextRevalidator")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl NextRevalidator {
    pub fn new(config: NextRevalidatorConfig) -> Result<Self, ClientError> {
        reqwest::Url::parse(&config.url).map_err(|e| ClientError::InvalidUrl {
            url: config.url.clone(),
            reason: e.to_string(),
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            client,
            url: config.url,
            token: config.token,
        })
    }

    /// Asks Next.js to revalidate the given route paths.
    pub async fn revalidate(&self, route_paths: &[RoutePath]) -> Result<(), ClientError> {
        let body = DocumentList::from_route_paths(route_paths);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|source| ClientError::Request {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ClientError::UnexpectedStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        debug!(count = route_paths.len(), "Next.js accepted revalidation");
        Ok(())
    }
}

impl RevalidationSink for NextRevalidator {
    type Error = ClientError;

    async fn revalidate(&self, route_paths: &[RoutePath]) -> Result<(), Self::Error> {
        NextRevalidator::revalidate(self, route_paths).await
    }
}
