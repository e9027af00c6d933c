//! Fixed-capacity FIFO history.
//!
//! Backs the rolling telemetry history used for charting and the chat log.
//! Appending past capacity evicts the oldest entry, so `len() <= capacity()`
//! holds after every operation.

use serde::{Serialize, Serializer};
use std::collections::VecDeque;

/// Insertion-ordered buffer that keeps only the most recent `capacity` items.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedHistory<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedHistory<T> {
    /// Create an empty history holding at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an item, evicting from the front when over capacity.
    ///
    /// Returns the evicted item, if any. With a capacity of zero the pushed
    /// item itself is returned and nothing is retained.
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.capacity == 0 {
            return Some(item);
        }

        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Maximum number of retained items.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Most recently appended item.
    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Oldest retained item.
    pub fn oldest(&self) -> Option<&T> {
        self.items.front()
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator + '_ {
        self.items.iter()
    }
}

impl<T: Clone> BoundedHistory<T> {
    /// Copy out the retained items, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

impl<T: Serialize> Serialize for BoundedHistory<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.iter())
    }
}
