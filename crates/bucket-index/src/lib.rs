//! In-memory index of the bucket files of a log store.
//!
//! This crate provides the index layer that sits on one bucket directory:
//! - Slab storage for a mirror of the directory tree
//! - Incremental mutation driven by filesystem changes
//! - Resumable ordered cursors with reusable scratch buffers
//! - Selection of the buckets relevant to a key range

pub mod bucket;
pub mod cache;
pub mod error;
pub mod indexer;
pub mod path;
pub mod range;
pub mod storage;
pub mod watcher;

// Re-export main types
pub use bucket::{extract_start_key, BucketRange, SelectionStrategy, BUCKET_PROBE_WINDOW};
pub use cache::{BuildStats, CacheOptions, FileSystemCache};
pub use error::{BucketIndexError, Result};
pub use indexer::{DirectoryLister, FileNodes, ListedEntry, OsDirectoryLister};
pub use range::{RangeBuffers, TreeRange};
pub use storage::{Entry, EntryKind, EntryName};
pub use watcher::{apply_path_change, create_bucket_watcher, drain_events, WatcherEvent};
