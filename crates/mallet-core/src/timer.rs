//! Deferred tasks keyed on a timer clock.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Handle for cancelling a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Due time with a total order.
#[derive(Debug, Clone, Copy)]
struct Due(f64);

impl PartialEq for Due {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Due {}

impl PartialOrd for Due {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Due {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Tasks that become due at a time on some [`Clock`](crate::Clock).
///
/// The queue never reads a clock itself; callers pass `now`. Tasks due at
/// the same time come out in scheduling order.
#[derive(Debug)]
pub struct DeferredQueue<T> {
    next_id: u64,
    pending: BTreeMap<(Due, u64), T>,
    due_by_id: HashMap<u64, Due>,
}

impl<T> DeferredQueue<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            pending: BTreeMap::new(),
            due_by_id: HashMap::new(),
        }
    }

    /// Run `task` once `delay` seconds have passed after `now`. Negative or
    /// non-finite delays make it due immediately.
    pub fn schedule(&mut self, now: f64, delay: f64, task: T) -> TimerId {
        let delay = if delay.is_finite() { delay.max(0.0) } else { 0.0 };
        let due = Due(now + delay);
        let id = self.next_id;
        self.next_id += 1;
        self.pending.insert((due, id), task);
        self.due_by_id.insert(id, due);
        TimerId(id)
    }

    /// Remove and return every task due at or before `now`, earliest first.
    pub fn drain_due(&mut self, now: f64) -> Vec<T> {
        let mut due = Vec::new();
        while let Some(entry) = self.pending.first_entry() {
            if entry.key().0 .0 > now {
                break;
            }
            let ((_, id), task) = entry.remove_entry();
            self.due_by_id.remove(&id);
            due.push(task);
        }
        due
    }

    /// Returns the task if it was still pending.
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let due = self.due_by_id.remove(&id.0)?;
        self.pending.remove(&(due, id.0))
    }

    pub fn next_due(&self) -> Option<f64> {
        self.pending.keys().next().map(|(due, _)| due.0)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.due_by_id.clear();
    }
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_in_due_order() {
        let mut queue = DeferredQueue::new();
        queue.schedule(0.0, 3.0, "c");
        queue.schedule(0.0, 1.0, "a");
        queue.schedule(0.0, 2.0, "b");

        assert!(queue.drain_due(0.5).is_empty());
        assert_eq!(queue.drain_due(2.0), vec!["a", "b"]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.next_due(), Some(3.0));
    }

    #[test]
    fn test_same_due_keeps_schedule_order() {
        let mut queue = DeferredQueue::new();
        queue.schedule(1.0, 1.0, 1);
        queue.schedule(0.0, 2.0, 2);
        assert_eq!(queue.drain_due(2.0), vec![1, 2]);
    }

    #[test]
    fn test_cancel() {
        let mut queue = DeferredQueue::new();
        let a = queue.schedule(0.0, 1.0, "a");
        queue.schedule(0.0, 1.0, "b");
        assert_eq!(queue.cancel(a), Some("a"));
        assert_eq!(queue.cancel(a), None);
        assert_eq!(queue.drain_due(5.0), vec!["b"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_bad_delay_is_due_now() {
        let mut queue = DeferredQueue::new();
        queue.schedule(4.0, f64::NAN, "nan");
        queue.schedule(4.0, -2.0, "neg");
        assert_eq!(queue.drain_due(4.0).len(), 2);
    }
}
