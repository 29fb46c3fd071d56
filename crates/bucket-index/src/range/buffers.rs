use crate::path::PathBuffer;
use crate::storage::{EntryName, SlabIndex};

/// A partially consumed directory: where to resume its listing.
#[derive(Debug, Clone, Copy)]
pub(super) struct Level {
    pub(super) dir: SlabIndex,
    /// Last child handed out; `None` before the first one.
    pub(super) last: Option<EntryName>,
}

impl Level {
    pub(super) fn new(dir: SlabIndex) -> Self {
        Self { dir, last: None }
    }
}

/// Reusable scratch storage for a [`TreeRange`](super::TreeRange) and the
/// [`BucketRange`](crate::bucket::BucketRange) built on it.
///
/// Fresh buffers hold no allocation. Starting a range allocates them, and
/// later ranges handed the same buffers reuse that capacity.
#[derive(Debug, Default)]
pub struct RangeBuffers {
    pub(super) stack: Vec<Level>,
    pub(super) path: PathBuffer,
    pub(super) file_name: String,
    /// Path of the bucket a bucket range currently yields.
    bucket_front: String,
    /// Path of the bucket held back by lookahead selection.
    bucket_carry: String,
}

impl RangeBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all state, keeping capacity.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.path.clear();
        self.file_name.clear();
        self.bucket_front.clear();
        self.bucket_carry.clear();
    }

    /// Capacity of the directory stack, for observing reuse.
    pub fn stack_capacity(&self) -> usize {
        self.stack.capacity()
    }

    pub(crate) fn bucket_front(&self) -> &str {
        &self.bucket_front
    }

    #[cfg(test)]
    pub(crate) fn bucket_capacity(&self) -> usize {
        self.bucket_front.capacity() + self.bucket_carry.capacity()
    }

    /// Makes the current file the bucket range's front.
    pub(crate) fn set_bucket_front(&mut self) {
        self.bucket_front.clear();
        self.bucket_front.push_str(&self.file_name);
    }

    /// Holds the current file back as the lookahead candidate.
    pub(crate) fn set_bucket_carry(&mut self) {
        self.bucket_carry.clear();
        self.bucket_carry.push_str(&self.file_name);
    }

    /// Moves the held-back candidate to the front.
    pub(crate) fn promote_bucket_carry(&mut self) {
        std::mem::swap(&mut self.bucket_front, &mut self.bucket_carry);
        self.bucket_carry.clear();
    }

    pub(crate) fn clear_bucket_front(&mut self) {
        self.bucket_front.clear();
    }
}
