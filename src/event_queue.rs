//! Time-ordered queue of pending deliveries.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

struct Entry<T> {
    time: f64,
    seq: u64,
    item: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// BinaryHeap is a max-heap, so the ordering is reversed to pop the smallest (time, seq) first.
impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Queue of items keyed by delivery time.
///
/// Items are dequeued in nondecreasing time order. Items with equal times are dequeued in the order they were
/// enqueued: every item is placed after all existing items with an equal or smaller time.
pub struct EventQueue<T> {
    heap: BinaryHeap<Entry<T>>,
    next_seq: u64,
}

impl<T> EventQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Inserts `item` to be delivered at `time`.
    pub fn enqueue(&mut self, time: f64, item: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry { time, seq, item });
    }

    /// Removes and returns the earliest item together with its time, or `None` if the queue is empty.
    pub fn dequeue(&mut self) -> Option<(f64, T)> {
        self.heap.pop().map(|entry| (entry.time, entry.item))
    }

    /// Returns the time of the earliest item without removing it.
    pub fn peek_time(&self) -> Option<f64> {
        self.heap.peek().map(|entry| entry.time)
    }

    /// Returns the number of queued items.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if the queue holds no items.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drops all queued items.
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
