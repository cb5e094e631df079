//! Neos content API client.
//!
//! Fetches the full document inventory from
//! `GET {base_url}/neos/content-api/documents`.
//!
//! In multi-site setups Neos resolves the site from the request host. When a
//! public base URL is configured, the request carries `X-Forwarded-Host`,
//! `X-Forwarded-Proto` and `X-Forwarded-Port` derived from it so the
//! internal request resolves to the public site.

use std::time::Duration;

use reqwest::Url;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::types::{DocumentList, RoutePath};

use super::{ClientError, DocumentSource};

const DOCUMENTS_PATH: &str = "/neos/content-api/documents";

/// Default timeout for the inventory request.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct NeosClientConfig {
    /// Internal base URL of the Neos instance.
    pub base_url: String,

    /// Public URL of the site, used for the forwarded headers.
    pub public_base_url: Option<String>,

    pub timeout: Duration,
}

impl NeosClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            public_base_url: None,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Client for the Neos document inventory.
#[derive(Debug, Clone)]
pub struct NeosClient {
    client: reqwest::Client,
    documents_url: String,
}

impl NeosClient {
    pub fn new(config: NeosClientConfig) -> Result<Self, ClientError> {
        let base = parse_url(&config.base_url)?;
        let documents_url = format!("{}{}", base.as_str().trim_end_matches('/'), DOCUMENTS_PATH);

        let headers = match &config.public_base_url {
            Some(public) => forwarded_headers(&parse_url(public)?)?,
            None => HeaderMap::new(),
        };

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            client,
            documents_url,
        })
    }

    /// Fetches the document inventory.
    pub async fn list_documents(&self) -> Result<Vec<RoutePath>, ClientError> {
        let url = &self.documents_url;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| ClientError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::UnexpectedStatus {
                url: url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| ClientError::Request {
                url: url.clone(),
                source,
            })?;
        let list: DocumentList =
            serde_json::from_slice(&body).map_err(|source| ClientError::Decode {
                url: url.clone(),
                source,
            })?;

        debug!(url = %url, count = list.documents.len(), "Fetched document inventory");
        Ok(list.into_route_paths())
    }
}

impl DocumentSource for NeosClient {
    type Error = ClientError;

    async fn list_documents(&self) -> Result<Vec<RoutePath>, Self::Error> {
        NeosClient::list_documents(self).await
    }
}

fn parse_url(raw: &str) -> Result<Url, ClientError> {
    let url = Url::parse(raw).map_err(|e| ClientError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.host_str().is_none() {
        return Err(ClientError::InvalidUrl {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(url)
}

/// Builds the `X-Forwarded-*` headers describing a public URL.
fn forwarded_headers(public: &Url) -> Result<HeaderMap, ClientError> {
    let invalid = |reason: String| ClientError::InvalidUrl {
        url: public.to_string(),
        reason,
    };

    let host = public
        .host_str()
        .ok_or_else(|| invalid("missing host".to_string()))?;
    let port = public
        .port_or_known_default()
        .ok_or_else(|| invalid(format!("no known port for scheme {}", public.scheme())))?;

    let mut headers = HeaderMap::new();
    for (name, value) in [
        ("x-forwarded-host", host.to_string()),
        ("x-forwarded-proto", public.scheme().to_string()),
        ("x-forwarded-port", port.to_string()),
    ] {
        let value = HeaderValue::from_str(&value).map_err(|e| invalid(e.to_string()))?;
        headers.insert(HeaderName::from_static(name), value);
    }
    Ok(headers)
}
