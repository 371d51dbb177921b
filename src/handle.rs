//! Generational handles.
//!
//! A [`Handle`] is a plain `(owner, key, generation)` value. The heap keeps a
//! table indexed by `key` recording the generation currently issued for that
//! key and, while the element is live, its position in the heap array.
//! Retiring a key bumps its generation, so copies of the old handle are
//! rejected in O(1) without any back-pointer into the heap. A key whose
//! generation is exhausted is never reissued.
//!
//! Once nothing is issued the table can be [`reset`](HandleTable::reset)
//! under a new owner token, which drops all bookkeeping while every handle
//! issued before still fails validation as foreign.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::HeapError;

/// Opaque token identifying one element of one heap instance.
///
/// Obtained from [`insert`](crate::IndexedMinHeap::insert) or
/// [`reserve_handle`](crate::IndexedMinHeap::reserve_handle). A handle is only
/// meaningful to the heap that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    owner: u64,
    key: u32,
    generation: u32,
}

impl Handle {
    /// Identity of the heap that issued this handle.
    #[inline]
    pub fn owner(&self) -> u64 {
        self.owner
    }

    #[inline]
    pub(crate) fn key(&self) -> u32 {
        self.key
    }
}

/// Process-wide source of heap identities.
pub(crate) fn next_owner() -> u64 {
    static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);
    NEXT_OWNER.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    generation: u32,
    /// Heap array index while bound; `None` for reserved or retired keys.
    position: Option<usize>,
    /// Key is on the free list or permanently retired.
    vacant: bool,
}

/// Key-to-position table backing every handle a heap has issued.
#[derive(Debug)]
pub(crate) struct HandleTable {
    owner: u64,
    entries: Vec<Entry>,
    free: Vec<u32>,
    /// Keys currently issued, bound or reserved.
    live: usize,
}

impl HandleTable {
    pub(crate) fn new(owner: u64) -> Self {
        Self {
            owner,
            entries: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    #[inline]
    pub(crate) fn owner(&self) -> u64 {
        self.owner
    }

    /// Issue a fresh, unbound handle.
    pub(crate) fn reserve(&mut self) -> Handle {
        let key = match self.free.pop() {
            Some(key) => {
                self.entries[key as usize].vacant = false;
                key
            }
            None => {
                let key = match u32::try_from(self.entries.len()) {
                    Ok(key) => key,
                    Err(_) => panic!("handle table exhausted: more than u32::MAX live handles"),
                };
                self.entries.push(Entry {
                    generation: 0,
                    position: None,
                    vacant: false,
                });
                key
            }
        };
        self.live += 1;
        Handle {
            owner: self.owner,
            key,
            generation: self.entries[key as usize].generation,
        }
    }

    fn entry(&self, handle: Handle) -> Result<&Entry, HeapError> {
        if handle.owner != self.owner {
            return Err(HeapError::ForeignHandle);
        }
        let entry = self
            .entries
            .get(handle.key as usize)
            .ok_or(HeapError::MalformedHandle { key: handle.key })?;
        if entry.vacant || entry.generation != handle.generation {
            return Err(HeapError::StaleHandle);
        }
        Ok(entry)
    }

    /// Position of a handle bound to a live element.
    pub(crate) fn position(&self, handle: Handle) -> Result<usize, HeapError> {
        self.entry(handle)?.position.ok_or(HeapError::UnboundHandle)
    }

    /// Check that `handle` is current and not yet bound, returning its key.
    pub(crate) fn check_unbound(&self, handle: Handle) -> Result<u32, HeapError> {
        match self.entry(handle)?.position {
            Some(_) => Err(HeapError::HandleInUse),
            None => Ok(handle.key),
        }
    }

    #[inline]
    pub(crate) fn set_position(&mut self, key: u32, position: usize) {
        self.entries[key as usize].position = Some(position);
    }

    /// Unbind `key` for good: bump its generation and recycle it. A key at
    /// the last generation stays vacant forever instead of wrapping.
    pub(crate) fn retire(&mut self, key: u32) {
        let entry = &mut self.entries[key as usize];
        entry.position = None;
        entry.vacant = true;
        self.live -= 1;
        if let Some(next) = entry.generation.checked_add(1) {
            entry.generation = next;
            self.free.push(key);
        }
    }

    /// Give back a reserved handle that was never inserted.
    pub(crate) fn release(&mut self, handle: Handle) -> Result<(), HeapError> {
        let key = self.check_unbound(handle)?;
        self.retire(key);
        Ok(())
    }

    /// Number of keys currently issued (bound or reserved).
    pub(crate) fn issued(&self) -> usize {
        self.live
    }

    /// Keys ever created and still tracked, issued or not.
    pub(crate) fn tracked(&self) -> usize {
        self.entries.len()
    }

    /// Forget every key and switch to a fresh owner token, keeping at most
    /// `keep` entries of allocation. Only valid when nothing is issued.
    pub(crate) fn reset(&mut self, keep: usize) {
        debug_assert_eq!(self.live, 0);
        self.owner = next_owner();
        self.entries.clear();
        self.entries.shrink_to(keep);
        self.free.clear();
        self.free.shrink_to(keep);
    }

    /// Bound positions, for invariant checks.
    #[cfg(test)]
    pub(crate) fn bound(&self) -> impl Iterator<Item = (u32, usize)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(key, e)| e.position.map(|p| (key as u32, p)))
    }
}
