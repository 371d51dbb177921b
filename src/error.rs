//! Error types for heap operations.

use thiserror::Error;

/// Broad failure category of a [`HeapError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller passed something that is not a usable argument at all.
    InvalidArgument,
    /// The arguments were well-formed but the heap is in the wrong state.
    InvalidOperation,
}

/// Errors returned by [`IndexedMinHeap`](crate::IndexedMinHeap) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeapError {
    #[error("heap is empty")]
    Empty,

    #[error("handle is not valid for this heap")]
    ForeignHandle,

    #[error("handle is not associated to a value")]
    StaleHandle,

    #[error("handle has not been inserted yet")]
    UnboundHandle,

    #[error("handle is already bound to a value")]
    HandleInUse,

    #[error("heap was modified while enumerating")]
    ConcurrentModification,

    #[error("handle key {key} was never issued by this heap")]
    MalformedHandle { key: u32 },

    #[error("offset {offset} is outside the target of length {len}")]
    OffsetOutOfRange { offset: usize, len: usize },

    #[error("not enough space in target: need {needed}, have {available}")]
    InsufficientSpace { needed: usize, available: usize },

    #[error("invalid element type for target at index {index}")]
    IncompatibleElement { index: usize },
}

impl HeapError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HeapError::MalformedHandle { .. }
            | HeapError::OffsetOutOfRange { .. }
            | HeapError::InsufficientSpace { .. }
            | HeapError::IncompatibleElement { .. } => ErrorKind::InvalidArgument,
            HeapError::Empty
            | HeapError::ForeignHandle
            | HeapError::StaleHandle
            | HeapError::UnboundHandle
            | HeapError::HandleInUse
            | HeapError::ConcurrentModification => ErrorKind::InvalidOperation,
        }
    }

    /// True when the error came from a handle that is not (or no longer)
    /// bound to a live element of this heap.
    pub fn is_handle_error(&self) -> bool {
        matches!(
            self,
            HeapError::ForeignHandle
                | HeapError::StaleHandle
                | HeapError::UnboundHandle
                | HeapError::HandleInUse
                | HeapError::MalformedHandle { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_split() {
        assert_eq!(HeapError::Empty.kind(), ErrorKind::InvalidOperation);
        assert_eq!(HeapError::StaleHandle.kind(), ErrorKind::InvalidOperation);
        assert_eq!(
            HeapError::MalformedHandle { key: 7 }.kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            HeapError::InsufficientSpace { needed: 3, available: 1 }.kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            HeapError::ConcurrentModification.to_string(),
            "heap was modified while enumerating"
        );
        assert_eq!(
            HeapError::OffsetOutOfRange { offset: 9, len: 4 }.to_string(),
            "offset 9 is outside the target of length 4"
        );
    }

    #[test]
    fn test_is_handle_error() {
        assert!(HeapError::ForeignHandle.is_handle_error());
        assert!(HeapError::MalformedHandle { key: 0 }.is_handle_error());
        assert!(!HeapError::Empty.is_handle_error());
    }
}
