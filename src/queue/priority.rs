//! Priority rule for the revalidation queue.
//!
//! Every enqueue call draws a new [`Generation`]. Route paths invalidated in
//! that call are ranked by it; route paths that are merely part of the full
//! inventory go to the [`Priority::Backlog`].
//!
//! Ordering (smallest first, i.e. popped first):
//! 1. `Invalidated(g)` by ascending generation
//! 2. `Backlog`, always after every invalidated entry

use serde::Serialize;
use std::fmt;

/// The sequence number of an enqueue call. The first call is generation 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Generation(pub u64);

impl Generation {
    /// Returns the following generation.
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rank of a queued route path.
///
/// The derived `Ord` relies on variant order: `Invalidated` sorts before
/// `Backlog`, and invalidated entries compare by generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    /// Reported as changed by the enqueue call of this generation.
    Invalidated(Generation),
    /// Known from the inventory only.
    Backlog,
}

impl Priority {
    pub fn is_backlog(self) -> bool {
        matches!(self, Priority::Backlog)
    }
}
