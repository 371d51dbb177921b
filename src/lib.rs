//! # handle-heap
//!
//! A binary min-heap whose elements can be cancelled or re-prioritized in
//! O(log n) through stable, externally held [`Handle`]s.
//!
//! This is the primitive behind "next deadline wins" dispatchers: timer
//! queues, event schedulers, nearest-expiry eviction. The dispatcher owns the
//! ordering policy and keeps handles to reschedule or cancel its entries.
//!
//! ## Example
//!
//! ```rust
//! use handle_heap::IndexedMinHeap;
//!
//! let mut heap = IndexedMinHeap::new();
//! let h5 = heap.insert(5);
//! heap.push(3);
//! heap.push(8);
//! heap.push(1);
//!
//! assert_eq!(heap.pop(), Ok(1));
//! assert_eq!(heap.peek(), Ok(&3));
//!
//! // Reschedule 5 ahead of everything else.
//! heap.update(h5, 0).unwrap();
//! assert_eq!(heap.peek(), Ok(&0));
//!
//! assert_eq!(heap.remove(h5), Ok(0));
//! assert!(heap.remove(h5).is_err());
//! assert_eq!(heap.len(), 2);
//! ```
//!
//! ## Handles
//!
//! Handles are generational indices: plain `Copy` values checked in O(1)
//! against a per-heap table. A handle from another heap, or one whose element
//! has been removed, is rejected with an error instead of touching whatever
//! now occupies its old slot.
//!
//! ## Threading
//!
//! The heap is not internally synchronized. Callers that share it across
//! threads wrap it in their own lock; [`IndexedMinHeap::sync_root`] hands out
//! a single shared mutex for that purpose, which the heap itself never takes.

#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, OnceLock};

use log::{debug, trace};
use parking_lot::Mutex;

mod compare;
mod config;
mod error;
mod handle;
mod iter;

pub use compare::{Comparer, FnComparer, NaturalOrder, Reversed};
pub use config::{HeapConfig, DEFAULT_CAPACITY};
pub use error::{ErrorKind, HeapError};
pub use handle::Handle;
pub use iter::{Cursor, IntoIter, Iter};

use handle::{next_owner, HandleTable};

/// Lock shared by every caller that guards one heap externally.
pub type SyncRoot = Arc<Mutex<()>>;

// =============================================================================
// Slots
// =============================================================================

/// One occupied array position. Positions past `len` do not exist, so no
/// stale value or handle outlives its removal.
#[derive(Debug)]
pub(crate) struct Slot<T> {
    pub(crate) value: T,
    /// Handle table key bound to this value, if any.
    pub(crate) key: Option<u32>,
}

#[inline]
fn parent(index: usize) -> usize {
    (index - 1) / 2
}

#[inline]
fn left_child(index: usize) -> usize {
    2 * index + 1
}

// =============================================================================
// IndexedMinHeap
// =============================================================================

/// Binary min-heap with handle-based removal and re-prioritization.
///
/// The element comparing smallest under `C` is always at the root. Elements
/// that compare equal are never swapped, so their relative order is
/// unspecified.
pub struct IndexedMinHeap<T, C = NaturalOrder> {
    pub(crate) slots: Vec<Slot<T>>,
    /// Fixed for the heap's lifetime; cursors are tied to it.
    id: u64,
    handles: HandleTable,
    comparer: C,
    config: HeapConfig,
    version: u64,
    sync_root: OnceLock<SyncRoot>,
}

impl<T: Ord> IndexedMinHeap<T> {
    /// Empty heap with [`DEFAULT_CAPACITY`] slots, ordered by `T: Ord`.
    pub fn new() -> Self {
        Self::with_config(HeapConfig::new(), NaturalOrder)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(
            HeapConfig::new().with_initial_capacity(capacity),
            NaturalOrder,
        )
    }
}

impl<T, F> IndexedMinHeap<T, FnComparer<F>>
where
    F: Fn(&T, &T) -> Ordering,
{
    /// Empty heap ordered by a two-argument closure.
    pub fn from_fn(compare: F) -> Self {
        Self::with_config(HeapConfig::new(), FnComparer(compare))
    }

    pub fn with_capacity_and_fn(capacity: usize, compare: F) -> Self {
        Self::with_config(
            HeapConfig::new().with_initial_capacity(capacity),
            FnComparer(compare),
        )
    }
}

impl<T, C: Comparer<T>> IndexedMinHeap<T, C> {
    pub fn with_comparer(comparer: C) -> Self {
        Self::with_config(HeapConfig::new(), comparer)
    }

    pub fn with_capacity_and_comparer(capacity: usize, comparer: C) -> Self {
        Self::with_config(HeapConfig::new().with_initial_capacity(capacity), comparer)
    }
}

impl<T, C> IndexedMinHeap<T, C> {
    /// Empty heap with an explicit capacity policy.
    pub fn with_config(config: HeapConfig, comparer: C) -> Self {
        Self {
            slots: Vec::with_capacity(config.initial_capacity),
            id: next_owner(),
            handles: HandleTable::new(next_owner()),
            comparer,
            config,
            version: 0,
            sync_root: OnceLock::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slots currently allocated for the backing array.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Capacity the heap never shrinks below.
    #[inline]
    pub fn floor_capacity(&self) -> usize {
        self.config.initial_capacity
    }

    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    pub fn comparer(&self) -> &C {
        &self.comparer
    }

    /// Counter bumped by every operation that changes the heap's shape.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Owner token stamped on handles issued from now on.
    ///
    /// A fresh token is minted whenever the heap drains with no handle
    /// outstanding, so handles from before the drain read as foreign.
    #[inline]
    pub fn owner(&self) -> u64 {
        self.handles.owner()
    }

    #[inline]
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Handles issued and not yet retired, bound or merely reserved.
    pub fn issued_handles(&self) -> usize {
        self.handles.issued()
    }

    /// Always `false`: the heap takes no locks of its own.
    pub fn is_synchronized(&self) -> bool {
        false
    }

    /// Mutex for callers guarding this heap externally.
    ///
    /// Created on first request; every call returns the same lock.
    pub fn sync_root(&self) -> SyncRoot {
        Arc::clone(self.sync_root.get_or_init(|| Arc::new(Mutex::new(()))))
    }

    #[inline]
    fn touch(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    /// Record that the value now at `index` lives there.
    #[inline]
    fn sync_position(&mut self, index: usize) {
        if let Some(key) = self.slots[index].key {
            self.handles.set_position(key, index);
        }
    }

    // -------------------------------------------------------------------------
    // Handle lookups
    // -------------------------------------------------------------------------

    /// Issue an unbound handle to pass to [`insert_with_handle`] later.
    ///
    /// [`insert_with_handle`]: IndexedMinHeap::insert_with_handle
    pub fn reserve_handle(&mut self) -> Handle {
        self.handles.reserve()
    }

    /// Return a reserved handle that will never be inserted.
    pub fn release_handle(&mut self, handle: Handle) -> Result<(), HeapError> {
        self.handles.release(handle)
    }

    /// Value bound to `handle`.
    pub fn get(&self, handle: Handle) -> Result<&T, HeapError> {
        let index = self.handles.position(handle)?;
        Ok(&self.slots[index].value)
    }

    /// Like [`get`](Self::get), but `None` for any handle not bound here.
    pub fn try_get(&self, handle: Handle) -> Option<&T> {
        self.get(handle).ok()
    }

    /// Whether `handle` is bound to a live element of this heap.
    pub fn contains_handle(&self, handle: Handle) -> bool {
        self.handles.position(handle).is_ok()
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Smallest element.
    pub fn peek(&self) -> Result<&T, HeapError> {
        self.slots
            .first()
            .map(|slot| &slot.value)
            .ok_or(HeapError::Empty)
    }

    /// Values in array order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            slots: self.slots.iter(),
        }
    }

    /// Start a detached traversal checked against the version counter.
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.id, self.version)
    }

    /// Linear scan. Keep a [`Handle`] instead if this is on a hot path.
    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.contains_by(|v| v == value)
    }

    pub fn contains_by(&self, predicate: impl FnMut(&T) -> bool) -> bool {
        self.find(predicate).is_some()
    }

    fn find(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<usize> {
        self.slots.iter().position(|slot| predicate(&slot.value))
    }

    /// Clone every value into `target[offset..]`, in array order.
    pub fn copy_to(&self, target: &mut [T], offset: usize) -> Result<(), HeapError>
    where
        T: Clone,
    {
        self.check_target(target.len(), offset)?;
        for (dst, slot) in target[offset..].iter_mut().zip(&self.slots) {
            *dst = slot.value.clone();
        }
        Ok(())
    }

    /// Copy into a target of another element type.
    ///
    /// Every value is converted before anything is written, so a failed
    /// conversion leaves `target` untouched.
    pub fn copy_to_converted<U>(&self, target: &mut [U], offset: usize) -> Result<(), HeapError>
    where
        T: Clone,
        U: TryFrom<T>,
    {
        self.check_target(target.len(), offset)?;
        let converted = self
            .slots
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                U::try_from(slot.value.clone())
                    .map_err(|_| HeapError::IncompatibleElement { index })
            })
            .collect::<Result<Vec<U>, _>>()?;
        for (dst, value) in target[offset..].iter_mut().zip(converted) {
            *dst = value;
        }
        Ok(())
    }

    fn check_target(&self, len: usize, offset: usize) -> Result<(), HeapError> {
        if offset > len {
            return Err(HeapError::OffsetOutOfRange { offset, len });
        }
        let available = len - offset;
        if available < self.slots.len() {
            return Err(HeapError::InsufficientSpace {
                needed: self.slots.len(),
                available,
            });
        }
        Ok(())
    }

    /// Values in array order.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }

    /// Consume the heap, keeping array order.
    pub fn into_vec(self) -> Vec<T> {
        self.into_iter().collect()
    }

    // -------------------------------------------------------------------------
    // Capacity
    // -------------------------------------------------------------------------

    /// Remove every element and unbind every handle.
    pub fn clear(&mut self) {
        for slot in self.slots.drain(..) {
            if let Some(key) = slot.key {
                self.handles.retire(key);
            }
        }
        self.release_if_oversized();
        self.release_handles_if_idle();
        self.touch();
    }

    /// Shrink storage toward `max(len, floor)` when it is under-used.
    pub fn trim_excess(&mut self) {
        let capacity = self.slots.capacity();
        if !self.config.should_trim(self.slots.len(), capacity) {
            return;
        }
        let target = self.slots.len().max(self.config.initial_capacity);
        self.slots.shrink_to(target);
        debug!(
            "trimmed heap storage from {} to {} slots ({} live)",
            capacity,
            self.slots.capacity(),
            self.slots.len()
        );
    }

    fn release_if_oversized(&mut self) {
        debug_assert!(self.slots.is_empty());
        let capacity = self.slots.capacity();
        if self.config.should_release(capacity) {
            self.slots = Vec::with_capacity(self.config.initial_capacity);
            debug!(
                "released heap storage from {} to {} slots",
                capacity, self.config.initial_capacity
            );
        }
    }

    /// Drop handle bookkeeping once no handle is issued. Every older handle
    /// is rejected afterwards because the owner token changes.
    fn release_handles_if_idle(&mut self) {
        let tracked = self.handles.tracked();
        if tracked == 0 || self.handles.issued() != 0 {
            return;
        }
        self.handles.reset(self.config.initial_capacity);
        if self.config.should_release(tracked) {
            debug!(
                "released handle table of {} entries, new owner {}",
                tracked,
                self.handles.owner()
            );
        }
    }

    fn reserve_slot(&mut self) {
        let capacity = self.slots.capacity();
        if self.slots.len() < capacity {
            return;
        }
        let grown = self.config.grown_capacity(capacity);
        self.slots.reserve_exact(grown - self.slots.len());
        trace!("grew heap storage from {} to {} slots", capacity, grown);
    }
}

impl<T, C: Comparer<T>> IndexedMinHeap<T, C> {
    // -------------------------------------------------------------------------
    // Bubbling
    // -------------------------------------------------------------------------

    #[inline]
    fn greater(&self, a: usize, b: usize) -> bool {
        self.comparer.compare(&self.slots[a].value, &self.slots[b].value) == Ordering::Greater
    }

    /// Move the element at `index` toward the root while its parent is
    /// strictly greater. Returns whether anything moved.
    fn sift_up(&mut self, index: usize) -> bool {
        let mut current = index;
        while current > 0 {
            let up = parent(current);
            if !self.greater(up, current) {
                break;
            }
            self.slots.swap(up, current);
            self.sync_position(current);
            current = up;
        }
        if current == index {
            return false;
        }
        self.sync_position(current);
        self.touch();
        true
    }

    /// Move the element at `index` toward the leaves while its smaller child
    /// is strictly smaller. Returns whether anything moved.
    fn sift_down(&mut self, index: usize) -> bool {
        let len = self.slots.len();
        let mut current = index;
        loop {
            let mut child = left_child(current);
            if child >= len {
                break;
            }
            if child + 1 < len && self.greater(child, child + 1) {
                child += 1;
            }
            if !self.greater(current, child) {
                break;
            }
            self.slots.swap(child, current);
            self.sync_position(current);
            current = child;
        }
        if current == index {
            return false;
        }
        self.sync_position(current);
        self.touch();
        true
    }

    /// Restore the heap property around a slot whose value changed.
    fn resettle(&mut self, index: usize) {
        if !self.sift_up(index) {
            self.sift_down(index);
        }
    }

    // -------------------------------------------------------------------------
    // Insertion
    // -------------------------------------------------------------------------

    fn insert_slot(&mut self, value: T, key: Option<u32>) {
        self.reserve_slot();
        let index = self.slots.len();
        self.slots.push(Slot { value, key });
        self.sync_position(index);
        self.touch();
        self.sift_up(index);
    }

    /// Insert without a handle. The element can still be removed through
    /// [`pop`](Self::pop) or [`remove_value`](Self::remove_value).
    pub fn push(&mut self, value: T) {
        self.insert_slot(value, None);
    }

    /// Insert and return a handle bound to the new element.
    ///
    /// # Panics
    ///
    /// Panics if more than `u32::MAX` handles are outstanding at once.
    pub fn insert(&mut self, value: T) -> Handle {
        let handle = self.handles.reserve();
        self.insert_slot(value, Some(handle.key()));
        handle
    }

    /// Insert binding a handle obtained from [`reserve_handle`].
    ///
    /// Fails without inserting if the handle belongs to another heap, was
    /// released, or is already bound.
    ///
    /// [`reserve_handle`]: IndexedMinHeap::reserve_handle
    pub fn insert_with_handle(&mut self, value: T, handle: Handle) -> Result<(), HeapError> {
        let key = self.handles.check_unbound(handle)?;
        self.insert_slot(value, Some(key));
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Removal
    // -------------------------------------------------------------------------

    fn remove_at(&mut self, index: usize) -> T {
        let removed = self.slots.swap_remove(index);
        if let Some(key) = removed.key {
            self.handles.retire(key);
        }
        self.touch();
        if index < self.slots.len() {
            self.sync_position(index);
            self.resettle(index);
        } else if self.slots.is_empty() {
            self.release_if_oversized();
            self.release_handles_if_idle();
        }
        removed.value
    }

    /// Remove and return the smallest element.
    pub fn pop(&mut self) -> Result<T, HeapError> {
        if self.slots.is_empty() {
            return Err(HeapError::Empty);
        }
        Ok(self.remove_at(0))
    }

    /// Remove the element bound to `handle`. The handle is dead afterwards.
    pub fn remove(&mut self, handle: Handle) -> Result<T, HeapError> {
        let index = self.handles.position(handle)?;
        Ok(self.remove_at(index))
    }

    /// Remove the first element equal to `value`, scanning linearly.
    pub fn remove_value(&mut self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.remove_first_by(|v| v == value).is_some()
    }

    /// Remove and return the first element matching `predicate`.
    pub fn remove_first_by(&mut self, predicate: impl FnMut(&T) -> bool) -> Option<T> {
        let index = self.find(predicate)?;
        Some(self.remove_at(index))
    }

    // -------------------------------------------------------------------------
    // Re-prioritization
    // -------------------------------------------------------------------------

    /// Replace the value bound to `handle` and move it to its new place.
    /// Returns the previous value.
    pub fn update(&mut self, handle: Handle, value: T) -> Result<T, HeapError> {
        let index = self.handles.position(handle)?;
        let old = std::mem::replace(&mut self.slots[index].value, value);
        self.touch();
        self.resettle(index);
        Ok(old)
    }

    /// Consume the heap, returning values smallest first.
    pub fn into_sorted_vec(mut self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.slots.len());
        while let Ok(value) = self.pop() {
            out.push(value);
        }
        out
    }

    /// Check the heap property and the slot/handle bijection.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        for index in 1..self.slots.len() {
            if self.greater(parent(index), index) {
                return Err(format!("heap property violated at index {index}"));
            }
        }
        let mut keyed = 0usize;
        for (index, slot) in self.slots.iter().enumerate() {
            if slot.key.is_some() {
                keyed += 1;
            }
            if let Some(key) = slot.key {
                let bound = self.handles.bound().find(|&(k, _)| k == key);
                if bound != Some((key, index)) {
                    return Err(format!("slot {index} holds key {key} bound to {bound:?}"));
                }
            }
        }
        for (key, position) in self.handles.bound() {
            match self.slots.get(position) {
                Some(slot) if slot.key == Some(key) => {}
                _ => return Err(format!("key {key} points at position {position}")),
            }
        }
        if self.handles.bound().count() != keyed {
            return Err("bound handle count does not match keyed slots".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Trait impls
// =============================================================================

impl<T: Ord> Default for IndexedMinHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug, C> fmt::Debug for IndexedMinHeap<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T, C: Comparer<T>> Extend<T> for IndexedMinHeap<T, C> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

impl<T: Ord> FromIterator<T> for IndexedMinHeap<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        let mut heap = Self::with_capacity(lower.max(DEFAULT_CAPACITY));
        heap.extend(iter);
        heap
    }
}

impl<'a, T, C> IntoIterator for &'a IndexedMinHeap<T, C> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, C> IntoIterator for IndexedMinHeap<T, C> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            slots: self.slots.into_iter(),
        }
    }
}


#[cfg(test)]
mod proptests;
