use std::collections::VecDeque;

use crate::ProgressSnapshot;

pub const HISTORY_CAPACITY: usize = 25;

/// Bounded, newest-first buffer of progress snapshots.
///
/// Duplicates and out-of-order frames are kept as distinct entries.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRing {
    entries: VecDeque<ProgressSnapshot>,
    capacity: usize,
}

impl Default for HistoryRing {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl HistoryRing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert as newest; returns the evicted oldest entry on overflow.
    pub fn push(&mut self, snapshot: ProgressSnapshot) -> Option<ProgressSnapshot> {
        self.entries.push_front(snapshot);
        if self.entries.len() > self.capacity {
            self.entries.pop_back()
        } else {
            None
        }
    }

    pub fn latest(&self) -> Option<&ProgressSnapshot> {
        self.entries.front()
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &ProgressSnapshot> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
