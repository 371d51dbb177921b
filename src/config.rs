//! Capacity policy.

/// Initial (and floor) capacity used when none is given.
pub const DEFAULT_CAPACITY: usize = 4;

const DEFAULT_MIN_GROWTH: usize = 4;
const DEFAULT_SHRINK_FACTOR: usize = 4;
const DEFAULT_TRIM_THRESHOLD: f64 = 0.9;

/// How an [`IndexedMinHeap`](crate::IndexedMinHeap) sizes its backing storage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeapConfig {
    /// Slots allocated up front. The heap never shrinks below this.
    pub initial_capacity: usize,
    /// Minimum number of slots added when a full heap grows.
    pub min_growth: usize,
    /// On becoming empty, storage is released back to the floor once it has
    /// grown past `shrink_factor * initial_capacity`.
    pub shrink_factor: usize,
    /// [`trim_excess`](crate::IndexedMinHeap::trim_excess) compacts when
    /// `len < trim_threshold * capacity`.
    pub trim_threshold: f64,
}

impl HeapConfig {
    pub fn new() -> Self {
        Self {
            initial_capacity: DEFAULT_CAPACITY,
            min_growth: DEFAULT_MIN_GROWTH,
            shrink_factor: DEFAULT_SHRINK_FACTOR,
            trim_threshold: DEFAULT_TRIM_THRESHOLD,
        }
    }

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn with_min_growth(mut self, slots: usize) -> Self {
        self.min_growth = slots.max(1);
        self
    }

    pub fn with_shrink_factor(mut self, factor: usize) -> Self {
        self.shrink_factor = factor.max(1);
        self
    }

    pub fn with_trim_threshold(mut self, threshold: f64) -> Self {
        self.trim_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Capacity to grow to when `current` slots are all in use.
    pub(crate) fn grown_capacity(&self, current: usize) -> usize {
        current
            .saturating_mul(2)
            .max(current.saturating_add(self.min_growth.max(1)))
    }

    /// Whether storage of `capacity` slots should be released back to the
    /// floor once the heap is empty.
    pub(crate) fn should_release(&self, capacity: usize) -> bool {
        capacity > self.initial_capacity.saturating_mul(self.shrink_factor)
    }

    /// Whether `len` live slots under-use `capacity` enough to trim.
    pub(crate) fn should_trim(&self, len: usize, capacity: usize) -> bool {
        (len as f64) < (capacity as f64) * self.trim_threshold
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self::new()
    }
}
