//! Handles into the entry arena.

use std::num::NonZeroU32;

/// A compact 32-bit handle into the slab.
///
/// Stored off by one in a `NonZeroU32`, so `Option<SlabIndex>` stays 4 bytes
/// and parent links need no separate sentinel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct SlabIndex(NonZeroU32);

impl SlabIndex {
    /// Creates a handle for slot `index`.
    ///
    /// # Panics
    /// Panics if `index >= u32::MAX`.
    #[inline]
    pub fn new(index: usize) -> Self {
        let raw = u32::try_from(index)
            .ok()
            .and_then(|index| index.checked_add(1))
            .and_then(NonZeroU32::new);
        match raw {
            Some(raw) => Self(raw),
            None => panic!("slab index out of range: {index}"),
        }
    }

    /// Returns the slot position.
    #[inline]
    pub fn get(&self) -> usize {
        (self.0.get() - 1) as usize
    }
}
