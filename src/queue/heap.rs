//! Indexed binary min-heap keyed by route path.
//!
//! `std::collections::BinaryHeap` cannot change the rank of an element in
//! place, which promotion requires. This heap keeps a side index from route
//! path to slot so an entry can be located in O(1) and re-sifted in O(log n).
//!
//! Entries are ordered by `(priority, route_path)`, so entries of equal
//! priority pop in lexicographic order.

use std::collections::HashMap;

use crate::types::RoutePath;

use super::priority::Priority;

/// A queued route path with its current rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QueueEntry {
    pub route_path: RoutePath,
    pub priority: Priority,
}

/// What [`IndexedHeap::upsert`] did with a route path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Upsert {
    /// The route path was not queued and has been added.
    Inserted,
    /// The route path was in the backlog and now carries a generation.
    Promoted,
    /// The route path was already queued and kept its rank.
    Unchanged,
}

#[derive(Debug, Default)]
pub(crate) struct IndexedHeap {
    /// Heap-ordered entries; `entries[0]` pops next.
    entries: Vec<QueueEntry>,

    /// Slot of every entry in `entries`. Owned by the heap; kept in sync by `swap`.
    slots: HashMap<RoutePath, usize>,
}

impl IndexedHeap {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, route_path: &str) -> Option<&QueueEntry> {
        self.slots.get(route_path).map(|&slot| &self.entries[slot])
    }

    /// Inserts a route path or promotes it out of the backlog.
    ///
    /// An existing entry is only changed when it sits in the backlog and the
    /// new priority is a generation. An entry that already has a generation
    /// keeps it, and nothing is ever demoted to the backlog.
    pub fn upsert(&mut self, route_path: &RoutePath, priority: Priority) -> Upsert {
        if let Some(&slot) = self.slots.get(route_path) {
            let entry = &mut self.entries[slot];
            if entry.priority.is_backlog() && !priority.is_backlog() {
                entry.priority = priority;
                self.sift_up(slot);
                return Upsert::Promoted;
            }
            return Upsert::Unchanged;
        }

        let slot = self.entries.len();
        self.entries.push(QueueEntry {
            route_path: route_path.clone(),
            priority,
        });
        self.slots.insert(route_path.clone(), slot);
        self.sift_up(slot);
        Upsert::Inserted
    }

    /// Removes and returns the highest ranked entry.
    pub fn pop(&mut self) -> Option<QueueEntry> {
        if self.entries.is_empty() {
            return None;
        }

        let last = self.entries.len() - 1;
        self.swap(0, last);
        let entry = self.entries.pop()?;
        self.slots.remove(&entry.route_path);

        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        Some(entry)
    }

    fn less(&self, a: usize, b: usize) -> bool {
        let (a, b) = (&self.entries[a], &self.entries[b]);
        (a.priority, &a.route_path) < (b.priority, &b.route_path)
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.entries.swap(a, b);
        if let Some(slot) = self.slots.get_mut(&self.entries[a].route_path) {
            *slot = a;
        }
        if let Some(slot) = self.slots.get_mut(&self.entries[b].route_path) {
            *slot = b;
        }
    }

    fn sift_up(&mut self, mut slot: usize) {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if !self.less(slot, parent) {
                break;
            }
            self.swap(slot, parent);
            slot = parent;
        }
    }

    fn sift_down(&mut self, mut slot: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * slot + 1;
            let right = left + 1;
            let mut smallest = slot;

            if left < len && self.less(left, smallest) {
                smallest = left;
            }
            if right < len && self.less(right, smallest) {
                smallest = right;
            }
            if smallest == slot {
                break;
            }
            self.swap(slot, smallest);
            slot = smallest;
        }
    }

    /// Verifies the heap property and the side index. Test-only.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        assert_eq!(self.entries.len(), self.slots.len(), "index size mismatch");
        for (slot, entry) in self.entries.iter().enumerate() {
            assert_eq!(
                self.slots.get(&entry.route_path),
                Some(&slot),
                "stale slot for {}",
                entry.route_path
            );
            if slot > 0 {
                let parent = (slot - 1) / 2;
                assert!(!self.less(slot, parent), "heap order violated at {slot}");
            }
        }
    }
}
