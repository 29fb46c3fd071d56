//! Bucket selection over a key range.
//!
//! Bucket files are named by the hexadecimal start key of the data they hold,
//! spread over directory levels (`ab/cd/ef01.log`). A bucket covers keys from
//! its own start up to the next bucket's start, so a query for `[start, end)`
//! needs the last bucket starting at or before `start` plus every bucket
//! starting inside the range.

use memchr::memrchr;

use crate::cache::FileSystemCache;
use crate::error::{BucketIndexError, Result};
use crate::path::{split_file_name, split_path};
use crate::range::TreeRange;

/// Slack below the query start accepted by [`SelectionStrategy::Windowed`].
pub const BUCKET_PROBE_WINDOW: u64 = 4096;

/// Number of hex digits in a full key.
const KEY_DIGITS: usize = 16;

/// Parses the start key encoded in a root-relative bucket path.
///
/// Every directory component and the file stem (the name up to its last
/// `.`) must be non-empty hexadecimal. Their digits are concatenated and
/// left-aligned in a 64-bit key, so `ab/cd` and `abcd` both give
/// `0xabcd_0000_0000_0000`. Returns `None` for paths that do not name a
/// bucket, including ones with more than 16 digits.
pub fn extract_start_key(relative_path: &str) -> Option<u64> {
    let (dir, file_name) = split_file_name(relative_path);
    let stem = match memrchr(b'.', file_name.as_bytes()) {
        Some(pos) => &file_name[..pos],
        None => file_name,
    };

    let mut key = 0u64;
    let mut digits = 0usize;
    for component in split_path(dir).chain(std::iter::once(stem)) {
        if component.is_empty() {
            return None;
        }
        for c in component.chars() {
            let value = c.to_digit(16)?;
            digits += 1;
            if digits > KEY_DIGITS {
                return None;
            }
            key = (key << 4) | u64::from(value);
        }
    }
    Some(key << (4 * (KEY_DIGITS - digits)))
}

/// How bucket boundaries are resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionStrategy {
    /// Exact: holds back the latest bucket starting at or before the query
    /// start until the next bucket shows it is the one covering it.
    #[default]
    Lookahead,
    /// Approximate: accepts buckets starting less than
    /// [`BUCKET_PROBE_WINDOW`] below the query start. Cheaper, but misses a
    /// covering bucket that starts further back.
    Windowed,
}

/// Range of bucket paths relevant to a key query.
///
/// Wraps a [`TreeRange`] and yields the paths of the buckets that may hold
/// keys in `[start, end)`, in key order. Paths whose names do not parse as
/// keys are skipped. Bucket paths are kept in the range's [`RangeBuffers`],
/// so a query on reused buffers does not allocate.
///
/// [`RangeBuffers`]: crate::range::RangeBuffers
#[derive(Debug)]
pub struct BucketRange<'b> {
    inner: TreeRange<'b>,
    start: u64,
    end: u64,
    strategy: SelectionStrategy,
    /// Candidate held back by the lookahead strategy.
    carry: Option<u64>,
    front: Option<u64>,
    /// No more input will be consumed.
    done: bool,
}

impl<'b> BucketRange<'b> {
    pub(crate) fn new(
        cache: &FileSystemCache,
        inner: TreeRange<'b>,
        start: u64,
        end: u64,
        strategy: SelectionStrategy,
    ) -> Self {
        let mut range = Self {
            inner,
            start,
            end,
            strategy,
            carry: None,
            front: None,
            done: start >= end,
        };
        range.advance(cache);
        range
    }

    /// Path of the current bucket.
    pub fn front(&self) -> Result<&str> {
        match self.front {
            Some(_) => Ok(self.inner.buffers().bucket_front()),
            None => Err(BucketIndexError::RangeExhausted),
        }
    }

    /// Start key of the current bucket.
    pub fn front_key(&self) -> Option<u64> {
        self.front
    }

    /// Moves to the next relevant bucket.
    pub fn pop_front(&mut self, cache: &FileSystemCache) {
        if self.front.is_none() {
            return;
        }
        if !self.inner.is_current(cache) {
            self.inner.invalidate();
            self.clear();
            return;
        }
        self.advance(cache);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.front.is_none()
    }

    /// False once the underlying range has observed a change to its cache.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.inner.is_valid()
    }

    pub fn strategy(&self) -> SelectionStrategy {
        self.strategy
    }

    /// Returns the underlying range, for example to reclaim its buffers.
    pub fn into_inner(self) -> TreeRange<'b> {
        self.inner
    }

    fn clear(&mut self) {
        self.front = None;
        self.carry = None;
        self.inner.buffers_mut().clear_bucket_front();
        self.done = true;
    }

    fn advance(&mut self, cache: &FileSystemCache) {
        match self.strategy {
            SelectionStrategy::Lookahead => self.advance_lookahead(cache),
            SelectionStrategy::Windowed => self.advance_windowed(cache),
        }
    }

    fn advance_lookahead(&mut self, cache: &FileSystemCache) {
        loop {
            if self.done {
                // Flush the held-back candidate, if any
                self.front = self.carry.take();
                if self.front.is_some() {
                    self.inner.buffers_mut().promote_bucket_carry();
                }
                return;
            }
            if !self.inner.is_valid() {
                self.clear();
                return;
            }
            let Ok(path) = self.inner.front() else {
                self.done = true;
                continue;
            };
            let Some(key) = extract_start_key(path) else {
                self.inner.pop_front(cache);
                continue;
            };

            if key <= self.start {
                self.carry = Some(key);
                self.inner.buffers_mut().set_bucket_carry();
                self.inner.pop_front(cache);
                continue;
            }
            if key >= self.end {
                self.done = true;
                continue;
            }

            // `key` starts inside the query: the previous candidate is
            // confirmed and `key` takes its place.
            let previous = self.carry.replace(key);
            let buffers = self.inner.buffers_mut();
            if previous.is_some() {
                buffers.promote_bucket_carry();
            }
            buffers.set_bucket_carry();
            self.inner.pop_front(cache);
            if previous.is_some() {
                self.front = previous;
                return;
            }
        }
    }

    fn advance_windowed(&mut self, cache: &FileSystemCache) {
        loop {
            if self.done || !self.inner.is_valid() {
                self.clear();
                return;
            }
            let Ok(path) = self.inner.front() else {
                self.clear();
                return;
            };
            let Some(key) = extract_start_key(path) else {
                self.inner.pop_front(cache);
                continue;
            };

            if key >= self.end {
                self.clear();
                return;
            }
            if key.saturating_add(BUCKET_PROBE_WINDOW) > self.start {
                self.front = Some(key);
                self.inner.buffers_mut().set_bucket_front();
                self.inner.pop_front(cache);
                return;
            }
            self.inner.pop_front(cache);
        }
    }
}
