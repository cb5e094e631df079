//! Outbound collaborators of the controller.
//!
//! The controller only depends on the two traits below:
//! - [`DocumentSource`] lists every known route path (Neos content API)
//! - [`RevalidationSink`] revalidates a batch of route paths (Next.js)
//!
//! Both carry their own timeouts; the controller never cancels a call that
//! is already in flight.

pub mod error;
pub mod neos;
pub mod next;

use std::future::Future;

use crate::types::RoutePath;

pub use error::ClientError;
pub use neos::{NeosClient, NeosClientConfig};
pub use next::{NextRevalidator, NextRevalidatorConfig};

/// Lists the full inventory of route paths.
///
/// # Example (stub for testing)
///
/// ```ignore
/// struct FixedSource(Vec<RoutePath>);
///
/// impl DocumentSource for FixedSource {
///     type Error = std::convert::Infallible;
///
///     async fn list_documents(&self) -> Result<Vec<RoutePath>, Self::Error> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
pub trait DocumentSource: Send + Sync + 'static {
    /// The error type returned by this source.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch every known route path, in the order the source returns them.
    fn list_documents(&self) -> impl Future<Output = Result<Vec<RoutePath>, Self::Error>> + Send;
}

/// Submits a batch of route paths for revalidation.
pub trait RevalidationSink: Send + Sync + 'static {
    /// The error type returned by this sink.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Revalidate the given route paths as a single request.
    fn revalidate(
        &self,
        route_paths: &[RoutePath],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
