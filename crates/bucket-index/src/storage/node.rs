//! Tree entry types stored in the slab.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::ops::Bound;

use super::index_types::SlabIndex;
use super::name::EntryName;

/// Kind of a tree entry. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Ordered child listing of a directory, keyed by name.
///
/// Iteration is in ascending byte-wise name order.
#[derive(Debug, Default, Clone)]
pub struct ChildListing {
    children: BTreeMap<EntryName, SlabIndex>,
}

impl ChildListing {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<SlabIndex> {
        self.children.get(name).copied()
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    /// Inserts a child, returning false if the name was already taken.
    pub fn insert(&mut self, name: EntryName, index: SlabIndex) -> bool {
        match self.children.entry(name) {
            btree_map::Entry::Occupied(_) => false,
            btree_map::Entry::Vacant(slot) => {
                slot.insert(index);
                true
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<SlabIndex> {
        self.children.remove(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Iterates over children in name order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&EntryName, SlabIndex)> + '_ {
        self.children.iter().map(|(name, &index)| (name, index))
    }

    /// Returns the first child strictly after `name`, or the first child
    /// overall when `name` is `None`.
    pub fn next_after(&self, name: Option<&str>) -> Option<(&EntryName, SlabIndex)> {
        let lower = match name {
            Some(name) => Bound::Excluded(name),
            None => Bound::Unbounded,
        };
        self.children
            .range::<str, _>((lower, Bound::Unbounded))
            .next()
            .map(|(name, &index)| (name, index))
    }
}

/// A directory or bucket file in the tree.
#[derive(Debug)]
pub struct Entry {
    name: EntryName,
    kind: EntryKind,
    /// Weak handle to the containing directory. Only read by upward path
    /// queries; traversal always goes through the parent's listing.
    parent: Option<SlabIndex>,
    /// Present exactly when `kind` is `Directory`.
    children: Option<ChildListing>,
}

impl Entry {
    /// Creates a file entry.
    pub fn file(parent: Option<SlabIndex>, name: EntryName) -> Self {
        Self {
            name,
            kind: EntryKind::File,
            parent,
            children: None,
        }
    }

    /// Creates an empty directory entry.
    pub fn directory(parent: Option<SlabIndex>, name: EntryName) -> Self {
        Self {
            name,
            kind: EntryKind::Directory,
            parent,
            children: Some(ChildListing::new()),
        }
    }

    #[inline]
    pub fn name(&self) -> &EntryName {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    #[inline]
    pub fn parent(&self) -> Option<SlabIndex> {
        self.parent
    }

    #[inline]
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    #[inline]
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Returns the child listing; `None` for files.
    #[inline]
    pub fn children(&self) -> Option<&ChildListing> {
        self.children.as_ref()
    }

    #[inline]
    pub(crate) fn children_mut(&mut self) -> Option<&mut ChildListing> {
        self.children.as_mut()
    }
}
