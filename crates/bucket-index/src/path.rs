//! Path helpers for the bucket tree.
//!
//! All paths handled by the index are `/`-separated strings. Absolute paths
//! are converted to root-relative form once, at the API boundary, and the
//! tree only ever sees relative components.

use memchr::{memchr, memrchr};

use crate::error::{BucketIndexError, Result};

/// Directory separator used in every path the index produces or accepts.
pub const SEPARATOR: char = '/';

/// Normalizes a configured root path by stripping trailing separators.
///
/// `"/data/buckets/"` becomes `"/data/buckets"`, and `"/"` becomes `""` so
/// that every absolute path is considered under it.
pub fn normalize_root(root: &str) -> Result<String> {
    if root.trim().is_empty() {
        return Err(BucketIndexError::InvalidArgument(
            "root path must not be empty".to_string(),
        ));
    }
    Ok(root.trim_end_matches(SEPARATOR).to_string())
}

/// Returns `path` relative to `root`, without a leading separator.
///
/// The match is component-aware: `/a/bc` is not under `/a/b`. The root itself
/// maps to the empty string.
pub fn relative_to_root<'a>(root: &str, path: &'a str) -> Option<&'a str> {
    let rest = path.strip_prefix(root)?;
    if rest.is_empty() {
        return Some(rest);
    }
    rest.strip_prefix(SEPARATOR)
        .map(|relative| relative.trim_start_matches(SEPARATOR))
}

/// Iterates over the non-empty components of a `/`-separated path.
pub fn split_path(path: &str) -> Components<'_> {
    Components { rest: path }
}

/// Splits a relative path into its parent directory and final component.
///
/// Trailing separators are ignored. The parent is empty for top-level names.
pub fn split_file_name(path: &str) -> (&str, &str) {
    let path = path.trim_end_matches(SEPARATOR);
    match memrchr(b'/', path.as_bytes()) {
        Some(pos) => (&path[..pos], &path[pos + 1..]),
        None => ("", path),
    }
}

/// Iterator returned by [`split_path`].
#[derive(Debug, Clone)]
pub struct Components<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Components<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.rest.is_empty() {
                return None;
            }
            let (component, rest) = match memchr(b'/', self.rest.as_bytes()) {
                Some(pos) => (&self.rest[..pos], &self.rest[pos + 1..]),
                None => (self.rest, ""),
            };
            self.rest = rest;
            if !component.is_empty() {
                return Some(component);
            }
        }
    }
}

/// A growable relative path that follows directory descent and ascent.
///
/// `push` appends a component, `pop` removes the most recent one. Clearing
/// keeps the allocated capacity so the buffer can be reused across traversals.
#[derive(Debug, Default, Clone)]
pub struct PathBuffer {
    buf: String,
    marks: Vec<usize>,
}

impl PathBuffer {
    /// Creates an empty buffer without allocating.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a component, inserting a separator when needed.
    pub fn push(&mut self, component: &str) {
        self.marks.push(self.buf.len());
        if !self.buf.is_empty() {
            self.buf.push(SEPARATOR);
        }
        self.buf.push_str(component);
    }

    /// Removes the most recently pushed component.
    ///
    /// Returns `false` if the buffer was already at the root.
    pub fn pop(&mut self) -> bool {
        match self.marks.pop() {
            Some(mark) => {
                self.buf.truncate(mark);
                true
            }
            None => false,
        }
    }

    /// Returns the current path.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Returns the number of pushed components.
    #[inline]
    pub fn depth(&self) -> usize {
        self.marks.len()
    }

    /// Resets to the root, retaining capacity.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.marks.clear();
    }
}
