// THEORY:
// The `DetectionStore` is the session's memory of detections. It is an ordered,
// fixed-capacity ring buffer: appends go to the back and, once full, each append
// evicts the oldest entry from the front. There is exactly one retention policy;
// panels that only want the last few entries (the live feed shows ten) take a
// `recent(n)` view instead of trimming the store itself.

use crate::core_modules::detection::HazardDetection;
use std::collections::VecDeque;

pub const DEFAULT_STORE_CAPACITY: usize = 256;

/// An insertion-ordered, bounded sequence of detections.
#[derive(Debug, Clone)]
pub struct DetectionStore {
    entries: VecDeque<HazardDetection>,
    capacity: usize,
}

impl DetectionStore {
    /// Creates an empty store. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Creates a store pre-filled with `seed`, keeping only the newest entries if it overflows.
    pub fn with_entries(capacity: usize, seed: impl IntoIterator<Item = HazardDetection>) -> Self {
        let mut store = Self::new(capacity);
        for detection in seed {
            store.push(detection);
        }
        store
    }

    /// Appends a detection, returning the evicted oldest entry when the store was full.
    pub fn push(&mut self, detection: HazardDetection) -> Option<HazardDetection> {
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(detection);
        evicted
    }

    /// Oldest-to-newest iteration, the order filters must preserve.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HazardDetection> + ExactSizeIterator + Clone {
        self.entries.iter()
    }

    /// Up to `n` of the most recent entries, newest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &HazardDetection> {
        self.entries.iter().rev().take(n)
    }

    pub fn latest(&self) -> Option<&HazardDetection> {
        self.entries.back()
    }

    pub fn get(&self, id: u64) -> Option<&HazardDetection> {
        self.entries.iter().find(|d| d.id == id)
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

    pub fn to_vec(&self) -> Vec<HazardDetection> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for DetectionStore {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_CAPACITY)
    }
}
