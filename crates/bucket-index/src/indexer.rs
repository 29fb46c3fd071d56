//! Tree indexing.
//!
//! This module handles building and maintaining the directory tree:
//! - Enumerating the bucket root through a `DirectoryLister`
//! - Constructing slab-backed `FileNodes` from the walked tree
//! - Structural mutation of the tree

mod construct;
mod file_nodes;
mod fswalk;

pub use construct::construct_file_nodes;
pub use file_nodes::FileNodes;
pub use fswalk::{walk_it, DirectoryLister, ListedEntry, Node, OsDirectoryLister, WalkData};

#[cfg(test)]
pub(crate) use fswalk::tests::MemoryLister;
