//! Slab construction from a walked `Node` tree.
//!
//! Children are already sorted by the walk, so each listing is filled in
//! ascending order in a single recursive pass.

use super::file_nodes::FileNodes;
use super::fswalk::Node;
use crate::storage::{Entry, Slab, SlabIndex};

/// Builds a `FileNodes` tree from a walked tree rooted at `root`.
///
/// `capacity` is a hint for the number of entries.
pub fn construct_file_nodes(root: &Node, capacity: usize) -> FileNodes {
    let mut slab = Slab::with_capacity(capacity);
    let root_index = construct_node_recursive(None, root, &mut slab);
    FileNodes::from_parts(slab, root_index)
}

fn construct_node_recursive(
    parent: Option<SlabIndex>,
    node: &Node,
    slab: &mut Slab<Entry>,
) -> SlabIndex {
    if !node.is_dir {
        return slab.insert(Entry::file(parent, node.name));
    }

    let index = slab.insert(Entry::directory(parent, node.name));
    for child in &node.children {
        let child_index = construct_node_recursive(Some(index), child, slab);
        if let Some(listing) = slab.get_mut(index).and_then(Entry::children_mut) {
            listing.insert(child.name, child_index);
        }
    }
    index
}
