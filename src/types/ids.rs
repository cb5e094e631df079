//! Newtype wrapper for route paths.
//!
//! A route path (e.g. `/about` or `/en/contact`) identifies a single document
//! in Neos and a single page in Next.js. It is the key of the revalidation
//! queue, so its ordering (plain byte-wise string ordering) is part of the
//! queue's tie-break rule.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// The path of a routable document, used as the unique queue key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutePath(pub String);

impl RoutePath {
    /// Creates a new route path.
    ///
    /// Note: No normalization is applied; `/about` and `/about/` are distinct keys.
    pub fn new(s: impl Into<String>) -> Self {
        RoutePath(s.into())
    }

    /// Returns the route path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RoutePath {
    fn from(s: String) -> Self {
        RoutePath(s)
    }
}

impl From<&str> for RoutePath {
    fn from(s: &str) -> Self {
        RoutePath(s.to_string())
    }
}

impl Borrow<str> for RoutePath {
    fn borrow(&self) -> &str {
        &self.0
    }
}
