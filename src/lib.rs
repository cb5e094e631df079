//! Grazer - revalidates Next.js pages when documents change in Neos CMS.
//!
//! This library provides the revalidation queue, the controller that drains
//! it, and the HTTP collaborators around them.

pub mod clients;
pub mod config;
pub mod controller;
pub mod queue;
pub mod retry;
pub mod schedule;
pub mod server;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;
