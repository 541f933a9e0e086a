//! Virtual-time task queue.
//!
//! Holds every pending timer of the simulation (hour tick, background
//! tickers, narrative steps) on a single millisecond clock. Tasks fire in
//! `(due, seq)` order, so two tasks due at the same instant run in the order
//! they were scheduled.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::trace;

struct Scheduled<T> {
    due_ms: u64,
    seq: u64,
    task: T,
}

impl<T> PartialEq for Scheduled<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due_ms == other.due_ms && self.seq == other.seq
    }
}

impl<T> Eq for Scheduled<T> {}

impl<T> PartialOrd for Scheduled<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so the max-heap pops the earliest task first.
impl<T> Ord for Scheduled<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due_ms
            .cmp(&self.due_ms)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue of tasks keyed by virtual due time.
pub struct Scheduler<T> {
    now_ms: u64,
    next_seq: u64,
    queue: BinaryHeap<Scheduled<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            now_ms: 0,
            next_seq: 0,
            queue: BinaryHeap::new(),
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time (ms).
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Schedules `task` to fire `delay_ms` after now.
    pub fn schedule_in(&mut self, delay_ms: u64, task: T) {
        let due = self.now_ms.saturating_add(delay_ms);
        self.schedule_at(due, task);
    }

    /// Schedules `task` at an absolute virtual time, never earlier than now.
    pub fn schedule_at(&mut self, due_ms: u64, task: T) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.queue.push(Scheduled {
            due_ms: due_ms.max(self.now_ms),
            seq,
            task,
        });
        trace!(due_ms, seq, pending = self.queue.len(), "task scheduled");
    }

    /// Removes every pending task matching `pred`; returns how many were dropped.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> usize {
        let before = self.queue.len();
        self.queue.retain(|s| !pred(&s.task));
        before - self.queue.len()
    }

    /// Number of pending tasks matching `pred`.
    pub fn count_where(&self, mut pred: impl FnMut(&T) -> bool) -> usize {
        self.queue.iter().filter(|s| pred(&s.task)).count()
    }

    /// Latest due time among tasks matching `pred`.
    pub fn last_due_where(&self, mut pred: impl FnMut(&T) -> bool) -> Option<u64> {
        self.queue
            .iter()
            .filter(|s| pred(&s.task))
            .map(|s| s.due_ms)
            .max()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Pops the next task due at or before `until_ms`, moving the clock to
    /// its due time.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<T> {
        if self.queue.peek()?.due_ms > until_ms {
            return None;
        }
        let item = self.queue.pop()?;
        self.now_ms = item.due_ms;
        Some(item.task)
    }

    /// Moves the clock forward to `until_ms` once nothing more is due.
    pub fn finish_at(&mut self, until_ms: u64) {
        self.now_ms = self.now_ms.max(until_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(s: &mut Scheduler<&'static str>, until: u64) -> Vec<&'static str> {
        let mut fired = Vec::new();
        while let Some(task) = s.pop_due(until) {
            fired.push(task);
        }
        s.finish_at(until);
        fired
    }

    #[test]
    fn fires_in_due_order() {
        let mut s = Scheduler::new();
        s.schedule_in(300, "c");
        s.schedule_in(100, "a");
        s.schedule_in(200, "b");
        assert_eq!(drain(&mut s, 1000), vec!["a", "b", "c"]);
        assert_eq!(s.now_ms(), 1000);
    }

    #[test]
    fn ties_fire_in_schedule_order() {
        let mut s = Scheduler::new();
        s.schedule_in(100, "first");
        s.schedule_in(100, "second");
        s.schedule_in(100, "third");
        assert_eq!(drain(&mut s, 100), vec!["first", "second", "third"]);
    }

    #[test]
    fn leaves_future_tasks_pending() {
        let mut s = Scheduler::new();
        s.schedule_in(100, "soon");
        s.schedule_in(5000, "later");
        assert_eq!(drain(&mut s, 1000), vec!["soon"]);
        assert_eq!(s.len(), 1);
        assert_eq!(drain(&mut s, 5000), vec!["later"]);
    }

    #[test]
    fn pop_moves_clock_to_due_time() {
        let mut s = Scheduler::new();
        s.schedule_in(250, "x");
        assert_eq!(s.pop_due(1000), Some("x"));
        assert_eq!(s.now_ms(), 250);
    }

    #[test]
    fn cancel_removes_matching_only() {
        let mut s = Scheduler::new();
        s.schedule_in(10, "keep");
        s.schedule_in(20, "drop");
        s.schedule_in(30, "drop");
        assert_eq!(s.cancel_where(|t| *t == "drop"), 2);
        assert_eq!(s.count_where(|t| *t == "keep"), 1);
        assert_eq!(drain(&mut s, 100), vec!["keep"]);
    }

    #[test]
    fn past_due_is_clamped_to_now() {
        let mut s = Scheduler::new();
        s.finish_at(500);
        s.schedule_at(100, "late");
        assert_eq!(s.last_due_where(|_| true), Some(500));
    }
}
