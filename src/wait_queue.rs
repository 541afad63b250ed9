//! FIFO wait queue that keeps residence statistics.

use std::collections::VecDeque;

use crate::stats::Population;

/// Queue of items waiting for a resource.
///
/// Every item is stored along with its arrival time, so that removal from either end records the time spent in
/// the queue. Removal always records statistics, regardless of what the caller does with the removed item.
pub struct WaitQueue<T> {
    items: VecDeque<(T, f64)>,
    stats: Population,
}

impl<T> WaitQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
            stats: Population::new(),
        }
    }

    /// Returns the item at the head of the queue.
    pub fn top(&self) -> Option<&T> {
        self.items.front().map(|(item, _)| item)
    }

    /// Appends an item arriving at `timestamp`.
    pub fn push(&mut self, item: T, timestamp: f64) {
        self.items.push_back((item, timestamp));
        self.stats.enter(timestamp);
    }

    /// Removes the head item at `timestamp`.
    pub fn shift(&mut self, timestamp: f64) -> Option<T> {
        let (item, arrived_at) = self.items.pop_front()?;
        self.stats.leave(arrived_at, timestamp);
        Some(item)
    }

    /// Removes the tail item at `timestamp`.
    pub fn pop(&mut self, timestamp: f64) -> Option<T> {
        let (item, arrived_at) = self.items.pop_back()?;
        self.stats.leave(arrived_at, timestamp);
        Some(item)
    }

    /// Records an item which passed through the queue without waiting.
    pub fn passby(&mut self, timestamp: f64) {
        self.stats.enter(timestamp);
        self.stats.leave(timestamp, timestamp);
    }

    /// Returns `true` if no items are waiting.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of waiting items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Closes open statistics intervals at `timestamp`.
    pub fn finalize(&mut self, timestamp: f64) {
        self.stats.finalize(timestamp);
    }

    /// Drops all waiting items and clears statistics.
    pub fn reset(&mut self) {
        self.items.clear();
        self.stats.reset();
    }

    /// Returns queue statistics.
    pub fn stats(&self) -> &Population {
        &self.stats
    }
}

impl<T> Default for WaitQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_and_lifo_removal() {
        let mut queue = WaitQueue::new();
        queue.push('a', 0.);
        queue.push('b', 1.);
        queue.push('c', 2.);
        assert_eq!(queue.top(), Some(&'a'));
        assert_eq!(queue.shift(3.), Some('a'));
        assert_eq!(queue.pop(3.), Some('c'));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.top(), Some(&'b'));
        assert_eq!(queue.stats().current(), 1);
        // waited 3 and 1
        assert_eq!(queue.stats().duration_series().count(), 2);
        assert_eq!(queue.stats().duration_series().average(), 2.);
        assert_eq!(queue.shift(4.), Some('b'));
        assert_eq!(queue.shift(4.), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_passby_records_zero_wait() {
        let mut queue: WaitQueue<()> = WaitQueue::new();
        queue.passby(5.);
        queue.passby(7.);
        assert_eq!(queue.stats().current(), 0);
        assert_eq!(queue.stats().duration_series().count(), 2);
        assert_eq!(queue.stats().duration_series().max(), 0.);
    }

    #[test]
    fn test_reset() {
        let mut queue = WaitQueue::new();
        queue.push("x", 0.);
        queue.reset();
        assert!(queue.is_empty());
        assert_eq!(queue.stats().current(), 0);
        assert_eq!(queue.stats().size_series().count(), 0);
    }
}
