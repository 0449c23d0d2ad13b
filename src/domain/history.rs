//! Fixed-capacity FIFO window of archived records.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct BoundedHistoryWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedHistoryWindow<T> {
    /// Panics if `capacity` is zero; configuration validation clamps it first.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history window capacity must be at least 1");
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends to the back. Once at capacity, exactly one item is evicted
    /// from the front and returned.
    pub fn archive(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        debug_assert!(self.items.len() <= self.capacity);
        evicted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn latest_mut(&mut self) -> Option<&mut T> {
        self.items.back_mut()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    /// The most recent `n` items in chronological order.
    pub fn recent(&self, n: usize) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        let skip = self.items.len().saturating_sub(n);
        self.items.range(skip..)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: Clone> BoundedHistoryWindow<T> {
    /// The most recent `n` items (or fewer), oldest first.
    pub fn snapshot(&self, n: usize) -> Vec<T> {
        self.recent(n).cloned().collect()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}
