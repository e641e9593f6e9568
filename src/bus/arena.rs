//! Frame Arena
//!
//! A fixed-capacity bump allocator that is reset in bulk once per broadcast
//! cycle. It never grows: running out of room is reported to the caller.
//!
//! Allocations are addressed by [`ArenaSlice`] handles carrying the arena
//! generation they were made in. [`FrameArena::reset`] bumps the generation
//! instead of clearing memory, so any handle kept across a reset resolves to
//! `None` rather than to another message's bytes.

use crate::errors::{Result, SyncError};

/// Alignment of every allocation, in bytes.
pub const ARENA_ALIGN: usize = 8;

#[inline]
fn align_up(len: usize) -> Option<usize> {
    len.checked_add(ARENA_ALIGN - 1).map(|l| l & !(ARENA_ALIGN - 1))
}

/// Generation-tagged handle to bytes inside a [`FrameArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArenaSlice {
    generation: u32,
    offset: u32,
    len: u32,
}

impl ArenaSlice {
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Fixed-capacity bump arena.
#[derive(Debug)]
pub struct FrameArena {
    storage: Vec<u8>,
    /// Next free byte; always a multiple of [`ARENA_ALIGN`].
    cursor: usize,
    generation: u32,
}

impl FrameArena {
    /// Reserves `capacity` bytes up front.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(SyncError::InvalidArenaSize);
        }
        if u32::try_from(capacity).is_err() {
            return Err(SyncError::ArenaReserve { size: capacity });
        }

        let mut storage = Vec::new();
        storage
            .try_reserve_exact(capacity)
            .map_err(|_| SyncError::ArenaReserve { size: capacity })?;
        storage.resize(capacity, 0);

        Ok(Self {
            storage,
            cursor: 0,
            generation: 0,
        })
    }

    /// Bump-allocates `len` bytes and returns the handle together with the
    /// writable bytes. The contents are unspecified until written.
    pub fn alloc(&mut self, len: usize) -> Result<(ArenaSlice, &mut [u8])> {
        let remaining = self.remaining();
        let reserved = align_up(len)
            .filter(|&r| r <= remaining)
            .ok_or_else(|| SyncError::CapacityExhausted {
                requested: align_up(len).unwrap_or(usize::MAX),
                remaining,
                capacity: self.capacity(),
            })?;

        let offset = self.cursor;
        self.cursor += reserved;

        let slice = ArenaSlice {
            generation: self.generation,
            offset: offset as u32,
            len: len as u32,
        };
        Ok((slice, &mut self.storage[offset..offset + len]))
    }

    /// Allocates a byte-exact copy of `bytes`.
    pub fn alloc_copy(&mut self, bytes: &[u8]) -> Result<ArenaSlice> {
        let (slice, dst) = self.alloc(bytes.len())?;
        dst.copy_from_slice(bytes);
        Ok(slice)
    }

    /// Resolves `slice`. Returns `None` if it belongs to an older generation.
    #[must_use]
    pub fn get(&self, slice: ArenaSlice) -> Option<&[u8]> {
        if slice.generation != self.generation {
            return None;
        }
        let start = slice.offset as usize;
        self.storage.get(start..start + slice.len())
    }

    /// Frees every allocation and invalidates all outstanding handles.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Returns the backing memory. The arena has zero capacity afterwards.
    pub fn release(&mut self) {
        self.storage = Vec::new();
        self.reset();
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    #[must_use]
    pub fn used(&self) -> usize {
        self.cursor
    }

    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity() - self.cursor
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    #[inline]
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            FrameArena::with_capacity(0),
            Err(SyncError::InvalidArenaSize)
        ));
    }

    #[test]
    fn test_allocations_are_aligned() {
        let mut arena = FrameArena::with_capacity(64).unwrap();
        let a = arena.alloc_copy(&[1, 2, 3]).unwrap();
        assert_eq!(a.len(), 3);
        assert_eq!(arena.used(), ARENA_ALIGN);

        let b = arena.alloc_copy(&[4; 9]).unwrap();
        assert_eq!(arena.used(), 3 * ARENA_ALIGN);
        assert_eq!(arena.get(a).unwrap(), &[1, 2, 3]);
        assert_eq!(arena.get(b).unwrap(), &[4; 9]);
    }

    #[test]
    fn test_exhaustion_reports_sizes() {
        let mut arena = FrameArena::with_capacity(16).unwrap();
        arena.alloc(10).unwrap();

        let err = arena.alloc(1).unwrap_err();
        match err {
            SyncError::CapacityExhausted {
                requested,
                remaining,
                capacity,
            } => {
                assert_eq!(requested, 8);
                assert_eq!(remaining, 0);
                assert_eq!(capacity, 16);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_reset_invalidates_old_generation() {
        let mut arena = FrameArena::with_capacity(32).unwrap();
        let stale = arena.alloc_copy(b"stale").unwrap();

        arena.reset();
        assert!(arena.is_empty());
        assert!(arena.get(stale).is_none());

        let fresh = arena.alloc_copy(b"fresh").unwrap();
        assert_eq!(fresh.generation(), stale.generation() + 1);
        assert_eq!(arena.get(fresh).unwrap(), b"fresh");
    }

    #[test]
    fn test_release_drops_capacity() {
        let mut arena = FrameArena::with_capacity(32).unwrap();
        arena.release();
        assert_eq!(arena.capacity(), 0);
        assert!(arena.alloc(1).is_err());
    }
}
