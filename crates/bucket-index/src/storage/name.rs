//! Bounded inline names for tree entries.
//!
//! Bucket file names are short fixed-width hex digests, so names are stored
//! inline instead of on the heap. Ordering and equality are byte-wise, which
//! makes equal-width hex names sort in numeric order.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

use crate::error::{BucketIndexError, Result};

/// Maximum length of an entry name in bytes.
pub const MAX_NAME_LEN: usize = 50;

/// An entry name of at most [`MAX_NAME_LEN`] bytes of UTF-8.
#[derive(Clone, Copy)]
pub struct EntryName {
    len: u8,
    bytes: [u8; MAX_NAME_LEN],
}

impl EntryName {
    /// The empty name carried by the root entry.
    pub const EMPTY: Self = Self {
        len: 0,
        bytes: [0; MAX_NAME_LEN],
    };

    /// Creates a name, failing if it exceeds [`MAX_NAME_LEN`] bytes.
    pub fn new(name: &str) -> Result<Self> {
        if name.len() > MAX_NAME_LEN {
            return Err(BucketIndexError::InvalidArgument(format!(
                "name exceeds {MAX_NAME_LEN} bytes: {name}"
            )));
        }
        let mut bytes = [0; MAX_NAME_LEN];
        bytes[..name.len()].copy_from_slice(name.as_bytes());
        Ok(Self {
            len: name.len() as u8,
            bytes,
        })
    }

    /// Returns the name as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        // Only ever built from a `&str`, so the prefix is valid UTF-8.
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }

    /// Returns the raw name bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Returns the length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Returns true for the empty (root) name.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for EntryName {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl TryFrom<&str> for EntryName {
    type Error = BucketIndexError;

    fn try_from(name: &str) -> Result<Self> {
        Self::new(name)
    }
}

impl Deref for EntryName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl Borrow<str> for EntryName {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq for EntryName {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for EntryName {}

impl PartialOrd for EntryName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EntryName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl Hash for EntryName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Must agree with `str`'s hash for the `Borrow<str>` impl.
        self.as_str().hash(state)
    }
}

impl fmt::Debug for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
