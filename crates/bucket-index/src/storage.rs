//! Storage layer for the bucket tree.
//!
//! This module provides the low-level primitives the tree is built from:
//! - A slab arena with compact `u32` handles
//! - Bounded, inline entry names
//! - Entry nodes with ordered child listings

mod index_types;
mod name;
mod node;
mod slab;

pub use index_types::SlabIndex;
pub use name::{EntryName, MAX_NAME_LEN};
pub use node::{ChildListing, Entry, EntryKind};
pub use slab::Slab;
