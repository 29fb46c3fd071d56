//! FileSystemCache - the in-memory mirror of one bucket root.
//!
//! The cache scans the root once at construction. After that it only changes
//! through the mutation API, which the owner drives from filesystem change
//! notifications. All operations are synchronous and assume a single owner
//! thread serializes mutation and traversal.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::bucket::{BucketRange, SelectionStrategy};
use crate::error::{BucketIndexError, Result};
use crate::indexer::{construct_file_nodes, walk_it, DirectoryLister, FileNodes, OsDirectoryLister, WalkData};
use crate::path::{normalize_root, relative_to_root, split_file_name, split_path};
use crate::range::{RangeBuffers, TreeRange};
use crate::storage::{Entry, EntryName, SlabIndex};

/// Source of process-unique cache ids, so a range can tell caches apart.
static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Options for building a cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheOptions {
    /// Absolute root of the bucket tree.
    pub root: String,
    /// Absolute paths excluded from the initial scan, with their descendants.
    #[serde(default)]
    pub ignored: Vec<PathBuf>,
}

impl CacheOptions {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            ignored: Vec::new(),
        }
    }

    pub fn with_ignored(mut self, path: impl Into<PathBuf>) -> Self {
        self.ignored.push(path.into());
        self
    }
}

/// Counters from the most recent scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub files: usize,
    pub directories: usize,
    pub errors: usize,
    pub elapsed: Duration,
}

/// In-memory index of the buckets stored under one root.
#[derive(Debug)]
pub struct FileSystemCache {
    root: String,
    ignored: Vec<PathBuf>,
    nodes: FileNodes,
    instance: u64,
    stats: BuildStats,
}

impl FileSystemCache {
    /// Builds a cache by scanning `root` on the local filesystem.
    pub fn build(root: &str) -> Result<Self> {
        Self::build_with(CacheOptions::new(root), &OsDirectoryLister)
    }

    /// Builds a cache using the given options and directory lister.
    pub fn build_with<L: DirectoryLister>(options: CacheOptions, lister: &L) -> Result<Self> {
        let root = normalize_root(&options.root)?;
        let (nodes, stats) = scan(&root, &options.ignored, lister)?;
        log::info!(
            "bucket index built for {}: {} files, {} directories, {} errors in {}ms",
            display_root(&root),
            stats.files,
            stats.directories,
            stats.errors,
            stats.elapsed.as_millis()
        );
        Ok(Self {
            root,
            ignored: options.ignored,
            nodes,
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            stats,
        })
    }

    /// Rebuilds the tree from the local filesystem.
    pub fn rescan(&mut self) -> Result<()> {
        self.rescan_with(&OsDirectoryLister)
    }

    /// Rebuilds the tree using `lister`. Outstanding ranges become invalid.
    pub fn rescan_with<L: DirectoryLister>(&mut self, lister: &L) -> Result<()> {
        let (mut nodes, stats) = scan(&self.root, &self.ignored, lister)?;
        nodes.set_generation(self.nodes.generation() + 1);
        self.nodes = nodes;
        self.stats = stats;
        log::info!(
            "bucket index rescanned {}: {} files, {} directories in {}ms",
            display_root(&self.root),
            stats.files,
            stats.directories,
            stats.elapsed.as_millis()
        );
        Ok(())
    }

    /// Returns the normalized root path.
    #[inline]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Returns the ignored paths.
    #[inline]
    pub fn ignored(&self) -> &[PathBuf] {
        &self.ignored
    }

    /// Returns the underlying tree.
    #[inline]
    pub fn nodes(&self) -> &FileNodes {
        &self.nodes
    }

    /// Number of entries, including the root.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root entry always exists.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.nodes.generation()
    }

    #[inline]
    pub fn instance(&self) -> u64 {
        self.instance
    }

    /// Converts an absolute path into a root-relative one.
    pub fn relative_path<'a>(&self, absolute_path: &'a str) -> Result<&'a str> {
        relative_to_root(&self.root, absolute_path)
            .ok_or_else(|| BucketIndexError::PathNotUnderRoot(absolute_path.to_string()))
    }

    /// Records a new bucket file, creating missing directories on the way.
    ///
    /// Adding a file that is already indexed is a no-op.
    pub fn add_file(&mut self, absolute_path: &str) -> Result<()> {
        let relative = self.relative_path(absolute_path)?;
        let (dir, file_name) = split_file_name(relative);
        if file_name.is_empty() {
            return Err(BucketIndexError::InvalidArgument(format!(
                "no file name in {absolute_path}"
            )));
        }
        let name = EntryName::new(file_name)?;
        let parent = self.get_or_create_dirs(dir, absolute_path)?;

        match self.nodes.child(parent, &name) {
            Some(existing) if self.is_directory(existing) => Err(
                BucketIndexError::NotADirectory(absolute_path.to_string()),
            ),
            Some(_) => {
                log::debug!("bucket already indexed: {absolute_path}");
                Ok(())
            }
            None => {
                self.nodes.add_file(parent, name)?;
                log::debug!("indexed bucket {absolute_path}");
                Ok(())
            }
        }
    }

    /// Records a directory, creating missing ancestors. Existing directories
    /// are left untouched.
    pub fn add_directory(&mut self, absolute_path: &str) -> Result<()> {
        let relative = self.relative_path(absolute_path)?;
        self.get_or_create_dirs(relative, absolute_path)?;
        Ok(())
    }

    /// Removes a bucket file (or a directory and its subtree).
    ///
    /// Every directory on the way must exist. A missing final entry is a
    /// no-op; the return value tells whether anything was removed.
    pub fn delete_file(&mut self, absolute_path: &str) -> Result<bool> {
        let relative = self.relative_path(absolute_path)?;
        let (dir, file_name) = split_file_name(relative);
        if file_name.is_empty() {
            return Err(BucketIndexError::InvalidArgument(format!(
                "no file name in {absolute_path}"
            )));
        }

        let mut parent = self.nodes.root();
        for component in split_path(dir) {
            parent = self
                .nodes
                .child(parent, component)
                .filter(|&child| self.is_directory(child))
                .ok_or_else(|| BucketIndexError::MissingAncestor(absolute_path.to_string()))?;
        }

        let removed = self.nodes.delete_child(parent, file_name);
        if removed {
            log::debug!("removed {absolute_path} from bucket index");
        }
        Ok(removed)
    }

    /// Visits every entry in pre-order with its root-relative path.
    pub fn traverse<F>(&self, visit: F)
    where
        F: FnMut(&Entry, &str),
    {
        self.nodes.traverse(visit);
    }

    /// Opens a resumable range over all files, positioned at the first one.
    ///
    /// `buffers` supplies reusable scratch storage; without it the range
    /// owns its own.
    pub fn open_range<'b>(&self, buffers: Option<&'b mut RangeBuffers>) -> TreeRange<'b> {
        let mut range = TreeRange::new(buffers);
        range.start(self);
        range
    }

    /// Narrows `range` to the buckets whose keys can fall in `[start, end)`.
    pub fn select_bucket_range<'b>(
        &self,
        range: TreeRange<'b>,
        start: u64,
        end: u64,
    ) -> BucketRange<'b> {
        self.select_bucket_range_with(range, start, end, SelectionStrategy::Lookahead)
    }

    /// Like [`select_bucket_range`](Self::select_bucket_range) with an
    /// explicit strategy.
    pub fn select_bucket_range_with<'b>(
        &self,
        range: TreeRange<'b>,
        start: u64,
        end: u64,
        strategy: SelectionStrategy,
    ) -> BucketRange<'b> {
        BucketRange::new(self, range, start, end, strategy)
    }

    fn is_directory(&self, index: SlabIndex) -> bool {
        self.nodes.get(index).is_some_and(Entry::is_directory)
    }

    fn get_or_create_dirs(&mut self, dir: &str, absolute_path: &str) -> Result<SlabIndex> {
        // Validate every name first so a bad component cannot leave a
        // half-created chain behind.
        for component in split_path(dir) {
            EntryName::new(component)?;
        }

        let mut parent = self.nodes.root();
        for component in split_path(dir) {
            parent = match self.nodes.child(parent, component) {
                Some(child) if self.is_directory(child) => child,
                Some(_) => {
                    return Err(BucketIndexError::NotADirectory(absolute_path.to_string()));
                }
                None => self
                    .nodes
                    .add_subdirectory(parent, EntryName::new(component)?)?,
            };
        }
        Ok(parent)
    }
}

fn scan<L: DirectoryLister>(
    root: &str,
    ignored: &[PathBuf],
    lister: &L,
) -> Result<(FileNodes, BuildStats)> {
    let started = Instant::now();
    let walk_data = WalkData::new(root_dir(root), ignored);
    let tree = walk_it(lister, &walk_data)?;

    let files = walk_data.num_files.load(Ordering::Relaxed);
    let directories = walk_data.num_dirs.load(Ordering::Relaxed);
    let nodes = construct_file_nodes(&tree, files + directories + 1);
    let stats = BuildStats {
        files,
        directories,
        errors: walk_data.errors.load(Ordering::Relaxed),
        elapsed: started.elapsed(),
    };
    Ok((nodes, stats))
}

/// The filesystem directory for a normalized root (`""` is `/`).
fn root_dir(root: &str) -> &Path {
    if root.is_empty() {
        Path::new("/")
    } else {
        Path::new(root)
    }
}

fn display_root(root: &str) -> &str {
    if root.is_empty() {
        "/"
    } else {
        root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::{ListedEntry, MemoryLister};
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn empty_cache(root: &str) -> FileSystemCache {
        let lister = MemoryLister::default().with_dir(root, vec![]);
        FileSystemCache::build_with(CacheOptions::new(root), &lister).unwrap()
    }

    fn visited(cache: &FileSystemCache) -> Vec<String> {
        let mut paths = Vec::new();
        cache.traverse(|_, path| paths.push(path.to_string()));
        paths
    }

    #[test]
    fn build_rejects_empty_root() {
        assert!(matches!(
            FileSystemCache::build(""),
            Err(BucketIndexError::InvalidArgument(_))
        ));
    }

    #[test]
    fn build_normalizes_trailing_separator() {
        let lister = MemoryLister::default().with_dir("/data", vec![ListedEntry::file("00")]);
        let cache = FileSystemCache::build_with(CacheOptions::new("/data/"), &lister).unwrap();
        assert_eq!(cache.root(), "/data");
        assert_eq!(visited(&cache), vec!["", "00"]);
    }

    #[test]
    fn build_from_filesystem() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("ab")).unwrap();
        File::create(temp.path().join("ab/cd00")).unwrap();
        File::create(temp.path().join("0000")).unwrap();

        let cache = FileSystemCache::build(temp.path().to_str().unwrap()).unwrap();
        assert_eq!(visited(&cache), vec!["", "0000", "ab", "ab/cd00"]);
        assert_eq!(cache.stats().files, 2);
        assert_eq!(cache.stats().directories, 1);
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn build_skips_ignored_paths() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("tmp")).unwrap();
        File::create(temp.path().join("tmp/0001")).unwrap();
        File::create(temp.path().join("0002")).unwrap();

        let root = temp.path().to_str().unwrap();
        let options = CacheOptions::new(root).with_ignored(temp.path().join("tmp"));
        let cache = FileSystemCache::build_with(options, &OsDirectoryLister).unwrap();
        assert_eq!(visited(&cache), vec!["", "0002"]);
    }

    #[test]
    fn add_file_creates_intermediate_directories() {
        let mut cache = empty_cache("root");
        cache.add_file("root/a/b/c").unwrap();

        let mut entries = Vec::new();
        cache.traverse(|entry, path| entries.push((path.to_string(), entry.is_directory())));
        assert_eq!(
            entries,
            vec![
                (String::new(), true),
                ("a".to_string(), true),
                ("a/b".to_string(), true),
                ("a/b/c".to_string(), false),
            ]
        );
    }

    #[test]
    fn entry_count_matches_created_entries() {
        let mut cache = empty_cache("/r");
        cache.add_file("/r/00/01").unwrap();
        cache.add_file("/r/00/02").unwrap();
        cache.add_file("/r/10/11/12").unwrap();
        cache.add_file("/r/20").unwrap();

        // directories 00, 10, 10/11; files 00/01, 00/02, 10/11/12, 20; root
        let mut count = 0;
        cache.traverse(|_, _| count += 1);
        assert_eq!(count, 3 + 4 + 1);
        assert_eq!(cache.len(), count);
    }

    #[test]
    fn add_existing_file_is_noop() {
        let mut cache = empty_cache("/r");
        cache.add_file("/r/a/0001").unwrap();
        let generation = cache.generation();
        cache.add_file("/r/a/0001").unwrap();
        assert_eq!(cache.generation(), generation);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn add_file_through_a_file_fails() {
        let mut cache = empty_cache("/r");
        cache.add_file("/r/a").unwrap();
        assert!(matches!(
            cache.add_file("/r/a/b"),
            Err(BucketIndexError::NotADirectory(_))
        ));
        cache.add_file("/r/d/x").unwrap();
        assert!(matches!(
            cache.add_file("/r/d"),
            Err(BucketIndexError::NotADirectory(_))
        ));
    }

    #[test]
    fn add_file_rejects_long_names_without_partial_state() {
        let mut cache = empty_cache("/r");
        let long = "d".repeat(51);
        let result = cache.add_file(&format!("/r/ok/{long}/file"));
        assert!(matches!(result, Err(BucketIndexError::InvalidArgument(_))));
        assert_eq!(cache.len(), 1);

        let result = cache.add_file(&format!("/r/ok/{long}"));
        assert!(matches!(result, Err(BucketIndexError::InvalidArgument(_))));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn add_file_requires_a_file_name() {
        let mut cache = empty_cache("/r");
        assert!(matches!(
            cache.add_file("/r"),
            Err(BucketIndexError::InvalidArgument(_))
        ));
        assert!(matches!(
            cache.add_file("/r/"),
            Err(BucketIndexError::InvalidArgument(_))
        ));
    }

    #[test]
    fn mutations_enforce_root_prefix() {
        let mut cache = empty_cache("/data/buckets");
        assert!(matches!(
            cache.add_file("/elsewhere/00"),
            Err(BucketIndexError::PathNotUnderRoot(_))
        ));
        assert!(matches!(
            cache.add_file("/data/bucketsX/00"),
            Err(BucketIndexError::PathNotUnderRoot(_))
        ));
        assert!(matches!(
            cache.delete_file("/elsewhere/00"),
            Err(BucketIndexError::PathNotUnderRoot(_))
        ));
    }

    #[test]
    fn delete_is_idempotent() {
        let mut cache = empty_cache("root");
        cache.add_file("root/a/b/c").unwrap();

        assert!(cache.delete_file("root/a/b/c").unwrap());
        assert!(!cache.delete_file("root/a/b/c").unwrap());
        // Empty directories are kept
        assert_eq!(visited(&cache), vec!["", "a", "a/b"]);
    }

    #[test]
    fn delete_through_missing_directory_fails() {
        let mut cache = empty_cache("root");
        cache.add_file("root/a/b/c").unwrap();
        assert!(matches!(
            cache.delete_file("root/x/y"),
            Err(BucketIndexError::MissingAncestor(_))
        ));
        assert!(matches!(
            cache.delete_file("root/a/b/c/d"),
            Err(BucketIndexError::MissingAncestor(_))
        ));
    }

    #[test]
    fn delete_directory_removes_subtree() {
        let mut cache = empty_cache("/r");
        cache.add_file("/r/a/b/0001").unwrap();
        cache.add_file("/r/a/0002").unwrap();
        cache.add_file("/r/z").unwrap();

        assert!(cache.delete_file("/r/a").unwrap());
        assert_eq!(visited(&cache), vec!["", "z"]);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn add_directory_is_get_or_create() {
        let mut cache = empty_cache("/r");
        cache.add_directory("/r/a/b").unwrap();
        let generation = cache.generation();
        cache.add_directory("/r/a/b").unwrap();
        assert_eq!(cache.generation(), generation);
        assert_eq!(visited(&cache), vec!["", "a", "a/b"]);
    }

    #[test]
    fn rescan_replaces_tree_and_advances_generation() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_str().unwrap().to_string();
        let mut cache = FileSystemCache::build(&root).unwrap();
        let generation = cache.generation();

        File::create(temp.path().join("00ff")).unwrap();
        cache.rescan().unwrap();
        assert!(cache.generation() > generation);
        assert_eq!(visited(&cache), vec!["", "00ff"]);
    }

    #[test]
    fn root_slash_accepts_every_absolute_path() {
        let lister = MemoryLister::default().with_dir("/", vec![]);
        let mut cache = FileSystemCache::build_with(CacheOptions::new("/"), &lister).unwrap();
        assert_eq!(cache.root(), "");
        cache.add_file("/a/00").unwrap();
        assert_eq!(visited(&cache), vec!["", "a", "a/00"]);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: CacheOptions = serde_json::from_str(r#"{"root": "/data"}"#).unwrap();
        assert_eq!(options, CacheOptions::new("/data"));

        let options: CacheOptions =
            serde_json::from_str(r#"{"root": "/data", "ignored": ["/data/tmp"]}"#).unwrap();
        assert_eq!(options.ignored, vec![PathBuf::from("/data/tmp")]);
    }

    #[test]
    fn caches_have_distinct_instances() {
        let a = empty_cache("/r");
        let b = empty_cache("/r");
        assert_ne!(a.instance(), b.instance());
    }
}
