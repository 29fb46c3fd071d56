//! Resumable in-order cursor over the files in the tree.
//!
//! A `TreeRange` holds no borrow of the cache. Each step takes the cache by
//! reference and first checks that it is the same cache, unchanged since the
//! range started. Any structural change in between invalidates the range,
//! which then reports itself empty.

mod buffers;

pub use buffers::RangeBuffers;

use std::ops::{Deref, DerefMut};

use buffers::Level;

use crate::cache::FileSystemCache;
use crate::error::{BucketIndexError, Result};
use crate::indexer::FileNodes;
use crate::storage::Entry;

enum Scratch<'b> {
    Borrowed(&'b mut RangeBuffers),
    Owned(RangeBuffers),
}

impl Deref for Scratch<'_> {
    type Target = RangeBuffers;

    fn deref(&self) -> &RangeBuffers {
        match self {
            Scratch::Borrowed(buffers) => buffers,
            Scratch::Owned(buffers) => buffers,
        }
    }
}

impl DerefMut for Scratch<'_> {
    fn deref_mut(&mut self) -> &mut RangeBuffers {
        match self {
            Scratch::Borrowed(buffers) => buffers,
            Scratch::Owned(buffers) => buffers,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeState {
    Active,
    Exhausted,
    Invalidated,
}

/// Cursor over every file in the tree, in depth-first name order.
///
/// Directories are descended into but never surfaced. The front element is
/// the root-relative path of the current file.
pub struct TreeRange<'b> {
    scratch: Scratch<'b>,
    instance: u64,
    generation: u64,
    state: RangeState,
}

impl<'b> TreeRange<'b> {
    /// Creates an empty range. Borrowed buffers are reset first.
    pub fn new(buffers: Option<&'b mut RangeBuffers>) -> Self {
        let scratch = match buffers {
            Some(buffers) => {
                buffers.reset();
                Scratch::Borrowed(buffers)
            }
            None => Scratch::Owned(RangeBuffers::default()),
        };
        Self {
            scratch,
            instance: 0,
            generation: 0,
            state: RangeState::Exhausted,
        }
    }

    /// (Re)positions the range at the first file of `cache`.
    pub fn start(&mut self, cache: &FileSystemCache) {
        self.scratch.reset();
        self.instance = cache.instance();
        self.generation = cache.generation();
        self.state = RangeState::Active;

        let root = cache.nodes().root();
        self.scratch.stack.push(Level::new(root));
        self.advance(cache.nodes());
    }

    /// Returns the path of the current file.
    pub fn front(&self) -> Result<&str> {
        match self.state {
            RangeState::Active => Ok(&self.scratch.file_name),
            _ => Err(BucketIndexError::RangeExhausted),
        }
    }

    /// Moves to the next file.
    ///
    /// Does nothing on an empty range. If `cache` is not the cache the range
    /// started on, or it changed structurally since, the range is invalidated.
    pub fn pop_front(&mut self, cache: &FileSystemCache) {
        if self.state != RangeState::Active {
            return;
        }
        if !self.is_current(cache) {
            self.invalidate();
            return;
        }
        self.advance(cache.nodes());
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.state != RangeState::Active
    }

    /// False once the range has observed a change to its cache.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.state != RangeState::Invalidated
    }

    /// Whether `cache` is the unchanged cache this range started on.
    pub fn is_current(&self, cache: &FileSystemCache) -> bool {
        self.instance == cache.instance() && self.generation == cache.generation()
    }

    pub(crate) fn buffers(&self) -> &RangeBuffers {
        &self.scratch
    }

    pub(crate) fn buffers_mut(&mut self) -> &mut RangeBuffers {
        &mut self.scratch
    }

    pub(crate) fn invalidate(&mut self) {
        self.state = RangeState::Invalidated;
        self.scratch.file_name.clear();
    }

    fn advance(&mut self, nodes: &FileNodes) {
        let buffers: &mut RangeBuffers = &mut self.scratch;
        loop {
            let Some(level) = buffers.stack.last_mut() else {
                buffers.file_name.clear();
                self.state = RangeState::Exhausted;
                return;
            };

            let next = nodes
                .get(level.dir)
                .and_then(Entry::children)
                .and_then(|listing| listing.next_after(level.last.as_deref()));

            let Some((name, child)) = next else {
                buffers.stack.pop();
                buffers.path.pop();
                continue;
            };
            let name = *name;
            level.last = Some(name);

            let Some(entry) = nodes.get(child) else {
                continue;
            };
            if entry.is_directory() {
                buffers.stack.push(Level::new(child));
                buffers.path.push(&name);
                continue;
            }

            buffers.file_name.clear();
            buffers.file_name.push_str(buffers.path.as_str());
            if !buffers.file_name.is_empty() {
                buffers.file_name.push('/');
            }
            buffers.file_name.push_str(&name);
            return;
        }
    }
}

impl std::fmt::Debug for TreeRange<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeRange")
            .field("front", &self.front().ok())
            .field("instance", &self.instance)
            .field("generation", &self.generation)
            .field("state", &self.state)
            .finish()
    }
}
