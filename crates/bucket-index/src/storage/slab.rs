//! Heap-backed slab arena for tree entries.
//!
//! Values are addressed by stable [`SlabIndex`] handles. Freed slots go on a
//! stack and are handed out again, most recently freed first.

use std::fmt;

use super::index_types::SlabIndex;

/// Slab arena with slot reuse.
pub struct Slab<T> {
    slots: Vec<Option<T>>,
    /// Vacant slot positions.
    free: Vec<u32>,
}

impl<T> Default for Slab<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Slab<T> {
    /// Creates a new empty slab without allocating.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    /// Inserts a value, returning its stable index.
    pub fn insert(&mut self, value: T) -> SlabIndex {
        if let Some(position) = self.free.pop() {
            let index = SlabIndex::new(position as usize);
            self.slots[index.get()] = Some(value);
            return index;
        }
        let index = SlabIndex::new(self.slots.len());
        self.slots.push(Some(value));
        index
    }

    #[inline]
    pub fn get(&self, index: SlabIndex) -> Option<&T> {
        self.slots.get(index.get())?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, index: SlabIndex) -> Option<&mut T> {
        self.slots.get_mut(index.get())?.as_mut()
    }

    /// Removes the value at `index` if it exists, returning it.
    pub fn try_remove(&mut self, index: SlabIndex) -> Option<T> {
        let value = self.slots.get_mut(index.get())?.take()?;
        // Positions come from `SlabIndex`, so they fit in u32
        self.free.push(index.get() as u32);
        Some(value)
    }

    /// Returns the number of occupied slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> fmt::Debug for Slab<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slab")
            .field("len", &self.len())
            .field("slots", &self.slots.len())
            .finish()
    }
}
