//! A priority queue that stores arbitrary data sorted by time
//!
//! Defines a `Queue<T, P>` that stores items of type `T`, called 'plans', sorted by
//! `f64` time, a priority `P` and insertion order. Adding and retrieving a plan are
//! both *O*(log(*n*)).
//!
//! `Context` uses this queue for every scheduled callback: day starts are queued with
//! `ExecutionPhase::First` and replayed mobility events with `ExecutionPhase::Normal`,
//! so a day start always precedes anything stamped at the same instant.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A priority queue that stores arbitrary data sorted by time
///
/// If two plans are scheduled for the same time then the plan with the lowest
/// priority is placed earlier. If two plans have the same time and priority then
/// the plan that was added first is placed earlier. This FIFO tie-break is what
/// keeps a time-ordered event stream in its arrival order.
pub struct Queue<T, P: Ord> {
    queue: BinaryHeap<Entry<T, P>>,
    plan_counter: u64,
}

impl<T, P: Ord> Queue<T, P> {
    /// Create a new empty `Queue<T, P>`
    #[must_use]
    pub fn new() -> Queue<T, P> {
        Queue {
            queue: BinaryHeap::new(),
            plan_counter: 0,
        }
    }

    /// Add a plan to the queue at the specified time
    pub fn add_plan(&mut self, time: f64, data: T, priority: P) {
        let id = self.plan_counter;
        self.queue.push(Entry {
            time,
            priority,
            id,
            data,
        });
        self.plan_counter += 1;
    }

    /// Retrieve the earliest plan in the queue
    ///
    /// Returns the next plan if it exists or else `None` if the queue is empty
    pub fn get_next_plan(&mut self) -> Option<Plan<T>> {
        self.queue.pop().map(|entry| Plan {
            time: entry.time,
            data: entry.data,
        })
    }

    /// The time of the earliest plan without removing it
    #[must_use]
    pub fn next_time(&self) -> Option<f64> {
        self.queue.peek().map(|entry| entry.time)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl<T, P: Ord> Default for Queue<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

struct Entry<T, P: Ord> {
    time: f64,
    priority: P,
    id: u64,
    data: T,
}

impl<T, P: Ord> PartialEq for Entry<T, P> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T, P: Ord> Eq for Entry<T, P> {}

impl<T, P: Ord> PartialOrd for Entry<T, P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Entries are ordered by time, priority, and then insertion id. The ordering is
/// reversed because `BinaryHeap` is a max-heap.
impl<T, P: Ord> Ord for Entry<T, P> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Times are validated by `Context::add_plan`, so `total_cmp` agrees with `<`.
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.priority.cmp(&other.priority))
            .then_with(|| self.id.cmp(&other.id))
            .reverse()
    }
}

/// A plan that holds data of type `T` intended to be used at the specified time
pub struct Plan<T> {
    pub time: f64,
    pub data: T,
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::Queue;

    #[test]
    fn empty_queue() {
        let mut plan_queue = Queue::<(), ()>::new();
        assert!(plan_queue.get_next_plan().is_none());
        assert!(plan_queue.is_empty());
    }

    #[test]
    fn add_plans() {
        let mut plan_queue = Queue::new();
        plan_queue.add_plan(1.0, 1, ());
        plan_queue.add_plan(3.0, 3, ());
        plan_queue.add_plan(2.0, 2, ());
        assert_eq!(plan_queue.len(), 3);
        assert_eq!(plan_queue.next_time(), Some(1.0));

        let next_plan = plan_queue.get_next_plan().unwrap();
        assert_eq!(next_plan.time, 1.0);
        assert_eq!(next_plan.data, 1);

        let next_plan = plan_queue.get_next_plan().unwrap();
        assert_eq!(next_plan.time, 2.0);
        assert_eq!(next_plan.data, 2);

        let next_plan = plan_queue.get_next_plan().unwrap();
        assert_eq!(next_plan.time, 3.0);
        assert_eq!(next_plan.data, 3);

        assert!(plan_queue.get_next_plan().is_none());
    }

    #[test]
    fn same_time_and_priority_keeps_insertion_order() {
        let mut plan_queue = Queue::new();
        for value in 0..100 {
            plan_queue.add_plan(5.0, value, ());
        }
        for value in 0..100 {
            assert_eq!(plan_queue.get_next_plan().unwrap().data, value);
        }
    }

    #[test]
    fn lower_priority_runs_first_at_same_time() {
        let mut plan_queue = Queue::new();
        plan_queue.add_plan(1.0, "late", 2);
        plan_queue.add_plan(1.0, "early", 0);
        plan_queue.add_plan(0.5, "earliest", 9);

        assert_eq!(plan_queue.get_next_plan().unwrap().data, "earliest");
        assert_eq!(plan_queue.get_next_plan().unwrap().data, "early");
        assert_eq!(plan_queue.get_next_plan().unwrap().data, "late");
    }

    #[test]
    fn clear_drops_everything() {
        let mut plan_queue = Queue::new();
        plan_queue.add_plan(1.0, 1, ());
        plan_queue.clear();
        assert!(plan_queue.get_next_plan().is_none());
    }
}
