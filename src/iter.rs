//! Enumeration over heap contents.
//!
//! Values come out in heap-array order, not sorted order. [`Iter`] borrows
//! the heap, so the borrow checker rules out mutation while it is alive.
//! [`Cursor`] holds no borrow between steps and instead compares the heap's
//! version counter on every step.

use std::iter::FusedIterator;

use crate::error::HeapError;
use crate::{IndexedMinHeap, Slot};

/// Borrowing iterator returned by [`IndexedMinHeap::iter`].
#[derive(Debug)]
pub struct Iter<'a, T> {
    pub(crate) slots: std::slice::Iter<'a, Slot<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.slots.next().map(|slot| &slot.value)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.slots.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
        }
    }
}

/// Owning iterator returned by `IntoIterator for IndexedMinHeap`.
#[derive(Debug)]
pub struct IntoIter<T> {
    pub(crate) slots: std::vec::IntoIter<Slot<T>>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.slots.next().map(|slot| slot.value)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.slots.size_hint()
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}
impl<T> FusedIterator for IntoIter<T> {}

/// Detached, restartable traversal that detects modification at run time.
///
/// ```rust
/// use handle_heap::{HeapError, IndexedMinHeap};
///
/// let mut heap = IndexedMinHeap::new();
/// heap.push(3);
/// heap.push(8);
///
/// let mut cursor = heap.cursor();
/// assert!(cursor.next(&heap).unwrap().is_some());
/// heap.push(1);
/// assert_eq!(cursor.next(&heap), Err(HeapError::ConcurrentModification));
/// ```
#[derive(Debug, Clone)]
pub struct Cursor {
    /// Identity of the heap this cursor walks.
    owner: u64,
    version: u64,
    position: usize,
}

impl Cursor {
    pub(crate) fn new(owner: u64, version: u64) -> Self {
        Self {
            owner,
            version,
            position: 0,
        }
    }

    /// Advance to the next value.
    ///
    /// Fails with [`HeapError::ConcurrentModification`] if `heap` changed
    /// shape since this cursor started, and with [`HeapError::ForeignHandle`]
    /// if the cursor was started on a different heap.
    pub fn next<'a, T, C>(
        &mut self,
        heap: &'a IndexedMinHeap<T, C>,
    ) -> Result<Option<&'a T>, HeapError> {
        if heap.id() != self.owner {
            return Err(HeapError::ForeignHandle);
        }
        if heap.version() != self.version {
            return Err(HeapError::ConcurrentModification);
        }
        let value = heap.slots.get(self.position).map(|slot| &slot.value);
        if value.is_some() {
            self.position += 1;
        }
        Ok(value)
    }

    /// Restart from the first slot, adopting the heap's current version.
    pub fn reset<T, C>(&mut self, heap: &IndexedMinHeap<T, C>) {
        *self = heap.cursor();
    }

    /// Number of values yielded so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }
}
