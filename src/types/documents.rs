//! JSON document list exchanged with Neos and Next.js.
//!
//! The same shape is used in three places:
//! - the inbound invalidation sent by Neos to `POST /api/revalidate`
//! - the inventory returned by the Neos content API
//! - the outbound revalidation request sent to Next.js
//!
//! ```text
//! {"documents": [{"routePath": "/about"}, {"routePath": "/contact"}]}
//! ```

use serde::{Deserialize, Serialize};

use super::ids::RoutePath;

/// A single document reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    pub route_path: RoutePath,
}

/// An ordered list of document references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentList {
    pub documents: Vec<DocumentRef>,
}

impl DocumentList {
    /// Builds a document list from route paths, preserving order.
    pub fn from_route_paths<'a>(route_paths: impl IntoIterator<Item = &'a RoutePath>) -> Self {
        DocumentList {
            documents: route_paths
                .into_iter()
                .map(|route_path| DocumentRef {
                    route_path: route_path.clone(),
                })
                .collect(),
        }
    }

    /// Consumes the list, returning the route paths in order.
    pub fn into_route_paths(self) -> Vec<RoutePath> {
        self.documents.into_iter().map(|d| d.route_path).collect()
    }
}
