//! Deduplicating priority queue of route paths awaiting revalidation.
//!
//! The queue holds each route path at most once. Route paths reported as
//! invalidated are drained first, oldest enqueue call first; the remaining
//! inventory is drained afterwards in lexicographic order.
//!
//! # Promotion
//!
//! A route path that is already queued in the backlog is promoted in place
//! when a later call reports it as invalidated. Once a route path carries a
//! generation it keeps it until popped, so invalidating it again never moves
//! it further back in line.
//!
//! # Concurrency
//!
//! All state sits behind one `std::sync::Mutex`. `enqueue` and `pop` are
//! CPU-only and hold the lock for O(k log n), never across an await point.

mod heap;
pub mod priority;

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::types::RoutePath;

use heap::{IndexedHeap, Upsert};
pub use priority::{Generation, Priority};

/// Counts of what a single [`RevalidationQueue::enqueue`] call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnqueueOutcome {
    /// Generation drawn by this call.
    pub generation: Generation,
    /// Route paths that were not queued before.
    pub inserted: usize,
    /// Backlog route paths that now carry this call's generation.
    pub promoted: usize,
}

#[derive(Debug, Default)]
struct QueueState {
    generation: Generation,
    heap: IndexedHeap,
}

/// Thread-safe revalidation queue.
#[derive(Debug, Default)]
pub struct RevalidationQueue {
    state: Mutex<QueueState>,
}

impl RevalidationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    // Every operation leaves the heap consistent before returning, so a panic
    // elsewhere while the lock was held cannot have left it half-updated.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueues one batch of route paths.
    ///
    /// Draws the next generation (even when `invalidated` is empty), then:
    /// - every `invalidated` route path is inserted with that generation, or
    ///   promoted to it if it currently sits in the backlog;
    /// - every `background` route path is inserted into the backlog if absent.
    ///
    /// Route paths listed in both sets in the same call end up with the
    /// generation, since invalidated route paths are applied first.
    pub fn enqueue(&self, invalidated: &[RoutePath], background: &[RoutePath]) -> EnqueueOutcome {
        let mut state = self.lock();
        state.generation = state.generation.next();

        let mut outcome = EnqueueOutcome {
            generation: state.generation,
            ..EnqueueOutcome::default()
        };

        let priority = Priority::Invalidated(state.generation);
        for route_path in invalidated {
            match state.heap.upsert(route_path, priority) {
                Upsert::Inserted => outcome.inserted += 1,
                Upsert::Promoted => outcome.promoted += 1,
                Upsert::Unchanged => {}
            }
        }
        for route_path in background {
            if state.heap.upsert(route_path, Priority::Backlog) == Upsert::Inserted {
                outcome.inserted += 1;
            }
        }

        outcome
    }

    /// Removes and returns the next route path, or `None` when the queue is empty.
    pub fn pop(&self) -> Option<RoutePath> {
        self.lock().heap.pop().map(|entry| entry.route_path)
    }

    /// Removes up to `max` route paths in pop order under a single lock.
    ///
    /// Returns an empty vector when the queue is empty.
    pub fn pop_batch(&self, max: usize) -> Vec<RoutePath> {
        let mut state = self.lock();
        let mut batch = Vec::with_capacity(max.min(state.heap.len()));
        while batch.len() < max {
            match state.heap.pop() {
                Some(entry) => batch.push(entry.route_path),
                None => break,
            }
        }
        batch
    }

    pub fn len(&self) -> usize {
        self.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().heap.is_empty()
    }

    /// Generation drawn by the most recent enqueue call (`0` before the first).
    pub fn generation(&self) -> Generation {
        self.lock().generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{arb_route_path, paths};
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn priority_of(queue: &RevalidationQueue, route_path: &str) -> Option<Priority> {
        queue.lock().heap.get(route_path).map(|entry| entry.priority)
    }

    fn drain(queue: &RevalidationQueue) -> Vec<String> {
        std::iter::from_fn(|| queue.pop()).map(|p| p.0).collect()
    }

    // ─── Scenarios ───

    #[test]
    fn simple() {
        let queue = RevalidationQueue::new();
        queue.enqueue(&paths(&["/contact"]), &paths(&["/about", "/home"]));

        assert_eq!(drain(&queue), ["/contact", "/about", "/home"]);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn combine() {
        let queue = RevalidationQueue::new();
        queue.enqueue(&paths(&["/contact"]), &paths(&["/about", "/home"]));
        queue.enqueue(&paths(&["/about"]), &paths(&["/contact", "/home"]));

        assert_eq!(queue.len(), 3);
        assert_eq!(drain(&queue), ["/contact", "/about", "/home"]);
    }

    #[test]
    fn intermittent_pop_keeps_first_generation() {
        let queue = RevalidationQueue::new();
        queue.enqueue(
            &paths(&["/contact", "/support"]),
            &paths(&["/about", "/home", "/imprint"]),
        );
        assert_eq!(queue.pop().unwrap().as_str(), "/contact");

        queue.enqueue(
            &paths(&["/imprint", "/contact"]),
            &paths(&["/about", "/home", "/support"]),
        );

        assert_eq!(
            drain(&queue),
            ["/support", "/contact", "/imprint", "/about", "/home"]
        );
    }

    #[test]
    fn intermittent_pop_of_invalidated_batch() {
        let queue = RevalidationQueue::new();
        queue.enqueue(
            &paths(&["/contact", "/support"]),
            &paths(&["/about", "/home", "/imprint"]),
        );
        assert_eq!(queue.pop().unwrap().as_str(), "/contact");
        assert_eq!(queue.pop().unwrap().as_str(), "/support");
        assert_eq!(queue.pop().unwrap().as_str(), "/about");

        queue.enqueue(
            &paths(&["/imprint", "/contact"]),
            &paths(&["/about", "/home", "/support"]),
        );

        assert_eq!(
            drain(&queue),
            ["/contact", "/imprint", "/about", "/home", "/support"]
        );
    }

    #[test]
    fn empty_invalidated_still_draws_generation() {
        let queue = RevalidationQueue::new();
        assert_eq!(queue.generation(), Generation(0));

        let outcome = queue.enqueue(&[], &paths(&["/a"]));
        assert_eq!(outcome.generation, Generation(1));

        let outcome = queue.enqueue(&paths(&["/b"]), &[]);
        assert_eq!(outcome.generation, Generation(2));
        assert_eq!(priority_of(&queue, "/b"), Some(Priority::Invalidated(Generation(2))));
    }

    #[test]
    fn outcome_counts_inserts_and_promotions() {
        let queue = RevalidationQueue::new();
        let first = queue.enqueue(&paths(&["/a"]), &paths(&["/a", "/b", "/c"]));
        assert_eq!((first.inserted, first.promoted), (3, 0));

        let second = queue.enqueue(&paths(&["/a", "/b", "/d"]), &paths(&["/c", "/e"]));
        assert_eq!((second.inserted, second.promoted), (2, 1));
    }

    #[test]
    fn invalidated_wins_over_background_in_same_call() {
        let queue = RevalidationQueue::new();
        queue.enqueue(&paths(&["/z"]), &paths(&["/a", "/z"]));

        assert_eq!(priority_of(&queue, "/z"), Some(Priority::Invalidated(Generation(1))));
        assert_eq!(drain(&queue), ["/z", "/a"]);
    }

    #[test]
    fn duplicate_keys_in_one_call_are_queued_once() {
        let queue = RevalidationQueue::new();
        queue.enqueue(&paths(&["/a", "/a"]), &paths(&["/b", "/b", "/a"]));
        assert_eq!(drain(&queue), ["/a", "/b"]);
    }

    #[test]
    fn pop_batch_respects_limit_and_order() {
        let queue = RevalidationQueue::new();
        queue.enqueue(&paths(&["/c"]), &paths(&["/a", "/b", "/d"]));

        assert_eq!(queue.pop_batch(3), paths(&["/c", "/a", "/b"]));
        assert_eq!(queue.pop_batch(3), paths(&["/d"]));
        assert!(queue.pop_batch(3).is_empty());
    }

    #[test]
    fn pop_batch_of_zero_takes_nothing() {
        let queue = RevalidationQueue::new();
        queue.enqueue(&[], &paths(&["/a"]));

        assert!(queue.pop_batch(0).is_empty());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn concurrent_enqueue_and_pop_never_duplicate() {
        let queue = Arc::new(RevalidationQueue::new());
        let keys: Vec<RoutePath> = (0..200).map(|i| RoutePath::new(format!("/p/{i:03}"))).collect();

        let producers: Vec<_> = (0..4)
            .map(|t| {
                let queue = Arc::clone(&queue);
                let keys = keys.clone();
                std::thread::spawn(move || {
                    for chunk in keys.chunks(10).skip(t).step_by(2) {
                        queue.enqueue(chunk, &keys);
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        let popped: Vec<String> = drain(&queue);
        let mut deduped = popped.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(popped.len(), deduped.len());
        assert_eq!(popped.len(), keys.len());
    }

    // ─── Property tests ───

    #[derive(Debug, Clone)]
    enum Op {
        Enqueue(Vec<RoutePath>, Vec<RoutePath>),
        Pop,
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        let invalidated = prop::collection::vec(arb_route_path(), 0..6);
        let background = prop::collection::vec(arb_route_path(), 0..6);
        prop_oneof![
            2 => (invalidated, background).prop_map(|(i, b)| Op::Enqueue(i, b)),
            1 => Just(Op::Pop),
        ]
    }

    /// Reference model: key -> numeric priority, popped by the numeric rule.
    #[derive(Default)]
    struct Model {
        generation: u64,
        entries: BTreeMap<RoutePath, u64>,
    }

    impl Model {
        fn enqueue(&mut self, invalidated: &[RoutePath], background: &[RoutePath]) {
            self.generation += 1;
            for key in invalidated {
                let priority = self.entries.entry(key.clone()).or_insert(0);
                if *priority == 0 {
                    *priority = self.generation;
                }
            }
            for key in background {
                self.entries.entry(key.clone()).or_insert(0);
            }
        }

        fn pop(&mut self) -> Option<RoutePath> {
            let key = self
                .entries
                .iter()
                .min_by_key(|(key, priority)| (**priority == 0, **priority, (*key).clone()))
                .map(|(key, _)| key.clone())?;
            self.entries.remove(&key);
            Some(key)
        }
    }

    proptest! {
        /// Every pop agrees with the reference model.
        #[test]
        fn prop_matches_reference_model(ops in prop::collection::vec(arb_op(), 0..40)) {
            let queue = RevalidationQueue::new();
            let mut model = Model::default();

            for op in ops {
                match op {
                    Op::Enqueue(invalidated, background) => {
                        queue.enqueue(&invalidated, &background);
                        model.enqueue(&invalidated, &background);
                    }
                    Op::Pop => prop_assert_eq!(queue.pop(), model.pop()),
                }
                prop_assert_eq!(queue.len(), model.entries.len());
            }

            let mut remaining = Vec::new();
            while let Some(key) = model.pop() {
                remaining.push(key);
            }
            prop_assert_eq!(queue.pop_batch(usize::MAX), remaining);
        }

        /// A generation, once assigned, survives every later enqueue call.
        #[test]
        fn prop_priority_never_changes_once_set(
            first in prop::collection::vec(arb_route_path(), 1..6),
            later in prop::collection::vec(
                (prop::collection::vec(arb_route_path(), 0..6), prop::collection::vec(arb_route_path(), 0..6)),
                0..8,
            ),
        ) {
            let queue = RevalidationQueue::new();
            queue.enqueue(&first, &[]);

            for (invalidated, background) in later {
                queue.enqueue(&invalidated, &background);
                for key in &first {
                    prop_assert_eq!(
                        priority_of(&queue, key.as_str()),
                        Some(Priority::Invalidated(Generation(1)))
                    );
                }
            }
        }

        /// Backlog entries pop after all invalidated entries, and ties pop
        /// lexicographically.
        #[test]
        fn prop_drain_order(
            invalidated in prop::collection::vec(arb_route_path(), 0..10),
            background in prop::collection::vec(arb_route_path(), 0..10),
        ) {
            let queue = RevalidationQueue::new();
            queue.enqueue(&invalidated, &background);

            let mut expected_front: Vec<RoutePath> = invalidated.clone();
            expected_front.sort();
            expected_front.dedup();
            let mut expected_back: Vec<RoutePath> = background
                .iter()
                .filter(|key| !invalidated.contains(key))
                .cloned()
                .collect();
            expected_back.sort();
            expected_back.dedup();

            let drained = queue.pop_batch(usize::MAX);
            prop_assert_eq!(&drained[..expected_front.len()], &expected_front[..]);
            prop_assert_eq!(&drained[expected_front.len()..], &expected_back[..]);
        }

        /// Draining yields every held key exactly once.
        #[test]
        fn prop_drain_is_complete(
            batches in prop::collection::vec(
                (prop::collection::vec(arb_route_path(), 0..6), prop::collection::vec(arb_route_path(), 0..6)),
                1..6,
            ),
        ) {
            let queue = RevalidationQueue::new();
            let mut all = std::collections::BTreeSet::new();
            for (invalidated, background) in &batches {
                queue.enqueue(invalidated, background);
                all.extend(invalidated.iter().cloned());
                all.extend(background.iter().cloned());
            }

            let mut drained = queue.pop_batch(usize::MAX);
            prop_assert_eq!(drained.len(), all.len());
            drained.sort();
            prop_assert_eq!(drained, all.into_iter().collect::<Vec<_>>());
            prop_assert!(queue.is_empty());
        }
    }
}
