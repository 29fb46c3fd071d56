//! FileNodes - the directory tree stored in a slab arena.
//!
//! Every structural change bumps a generation counter. Cursors that outlive a
//! call compare it against their snapshot to detect that they are stale.

use crate::error::{BucketIndexError, Result};
use crate::path::PathBuffer;
use crate::storage::{Entry, EntryName, Slab, SlabIndex};

/// Directory tree backed by slab storage.
#[derive(Debug)]
pub struct FileNodes {
    slab: Slab<Entry>,
    root: SlabIndex,
    generation: u64,
}

impl Default for FileNodes {
    fn default() -> Self {
        Self::new()
    }
}

impl FileNodes {
    /// Creates a tree holding only the root directory.
    pub fn new() -> Self {
        let mut slab = Slab::new();
        let root = slab.insert(Entry::directory(None, EntryName::EMPTY));
        Self::from_parts(slab, root)
    }

    pub(crate) fn from_parts(slab: Slab<Entry>, root: SlabIndex) -> Self {
        Self {
            slab,
            root,
            generation: 0,
        }
    }

    /// Returns the root directory index.
    #[inline]
    pub fn root(&self) -> SlabIndex {
        self.root
    }

    /// Returns the structural generation.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }

    /// Returns the number of entries, including the root.
    #[inline]
    pub fn len(&self) -> usize {
        self.slab.len()
    }

    /// Always false: the root is never removed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slab.is_empty()
    }

    #[inline]
    pub fn get(&self, index: SlabIndex) -> Option<&Entry> {
        self.slab.get(index)
    }

    /// Looks up a direct child of `parent` by name.
    pub fn child(&self, parent: SlabIndex, name: &str) -> Option<SlabIndex> {
        self.slab.get(parent)?.children()?.get(name)
    }

    /// Creates a directory under `parent`. The name must not be taken.
    pub fn add_subdirectory(&mut self, parent: SlabIndex, name: EntryName) -> Result<SlabIndex> {
        self.insert_child(parent, Entry::directory(Some(parent), name))
    }

    /// Creates a file under `parent`. The name must not be taken.
    pub fn add_file(&mut self, parent: SlabIndex, name: EntryName) -> Result<SlabIndex> {
        self.insert_child(parent, Entry::file(Some(parent), name))
    }

    fn insert_child(&mut self, parent: SlabIndex, entry: Entry) -> Result<SlabIndex> {
        let name = *entry.name();
        let Some(listing) = self.slab.get(parent).and_then(Entry::children) else {
            return Err(BucketIndexError::NotADirectory(self.describe(parent)));
        };
        if listing.contains(&name) {
            return Err(BucketIndexError::AlreadyExists(self.describe_child(parent, &name)));
        }

        let index = self.slab.insert(entry);
        if let Some(listing) = self.slab.get_mut(parent).and_then(Entry::children_mut) {
            listing.insert(name, index);
        }
        self.generation += 1;
        Ok(index)
    }

    /// Removes the child `name` of `parent` and everything beneath it.
    ///
    /// Returns false, without touching the tree, if there is no such child.
    pub fn delete_child(&mut self, parent: SlabIndex, name: &str) -> bool {
        let Some(index) = self
            .slab
            .get_mut(parent)
            .and_then(Entry::children_mut)
            .and_then(|listing| listing.remove(name))
        else {
            return false;
        };
        self.remove_subtree(index);
        self.generation += 1;
        true
    }

    fn remove_subtree(&mut self, index: SlabIndex) {
        let mut stack = vec![index];
        while let Some(current) = stack.pop() {
            if let Some(entry) = self.slab.try_remove(current) {
                if let Some(children) = entry.children() {
                    stack.extend(children.iter().map(|(_, child)| child));
                }
            }
        }
    }

    /// Computes the root-relative path of a node from its parent handles.
    pub fn node_path(&self, index: SlabIndex) -> Option<String> {
        let mut segments = Vec::new();
        let mut current = index;
        loop {
            let entry = self.slab.get(current)?;
            match entry.parent() {
                Some(parent) => {
                    segments.push(entry.name().as_str());
                    current = parent;
                }
                None => break,
            }
        }
        segments.reverse();
        Some(segments.join("/"))
    }

    /// Visits every entry in pre-order with its root-relative path.
    ///
    /// The root is visited first with an empty path. Children are visited in
    /// name order, each directory before its own children.
    pub fn traverse<F>(&self, mut visit: F)
    where
        F: FnMut(&Entry, &str),
    {
        let mut path = PathBuffer::new();
        self.visit_recursive(self.root, &mut path, &mut visit);
    }

    fn visit_recursive<F>(&self, index: SlabIndex, path: &mut PathBuffer, visit: &mut F)
    where
        F: FnMut(&Entry, &str),
    {
        let Some(entry) = self.slab.get(index) else {
            return;
        };
        visit(entry, path.as_str());
        if let Some(children) = entry.children() {
            for (name, child) in children.iter() {
                path.push(name);
                self.visit_recursive(child, path, visit);
                path.pop();
            }
        }
    }

    fn describe(&self, index: SlabIndex) -> String {
        self.node_path(index).unwrap_or_default()
    }

    fn describe_child(&self, parent: SlabIndex, name: &str) -> String {
        let parent = self.describe(parent);
        if parent.is_empty() {
            name.to_string()
        } else {
            format!("{parent}/{name}")
        }
    }
}
