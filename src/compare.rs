//! Ordering policies.
//!
//! The heap keeps the element that compares smallest under its [`Comparer`]
//! at the root. Equal elements are never swapped, so ties come out in no
//! particular order.

use std::cmp::Ordering;

/// Total (or caller-guaranteed) ordering over `T`.
pub trait Comparer<T> {
    fn compare(&self, a: &T, b: &T) -> Ordering;
}

/// Uses `T`'s own [`Ord`] implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NaturalOrder;

impl<T: Ord> Comparer<T> for NaturalOrder {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

/// Wraps a two-argument ordering closure.
#[derive(Clone, Copy)]
pub struct FnComparer<F>(pub F);

impl<T, F> Comparer<T> for FnComparer<F>
where
    F: Fn(&T, &T) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        (self.0)(a, b)
    }
}

impl<F> std::fmt::Debug for FnComparer<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnComparer(..)")
    }
}

/// Inverts another comparer; `Reversed(NaturalOrder)` turns the heap into a
/// max-heap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reversed<C>(pub C);

impl<T, C: Comparer<T>> Comparer<T> for Reversed<C> {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        self.0.compare(b, a)
    }
}
