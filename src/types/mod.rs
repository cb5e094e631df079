//! Core domain types for grazer.
//!
//! Route paths are the only identifier the service deals with; the document
//! list is the JSON shape every collaborator speaks.

pub mod documents;
pub mod ids;

pub use documents::{DocumentList, DocumentRef};
pub use ids::RoutePath;
