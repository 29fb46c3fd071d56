//! Directory enumeration that builds an intermediate tree.
//!
//! The walk produces a `Node` tree with children sorted by name. Sibling
//! directories are walked in parallel; sorting happens after collection, so
//! the enumeration order of the underlying lister does not matter.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::storage::EntryName;

/// One direct child reported by a [`DirectoryLister`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub name: String,
    pub is_dir: bool,
}

impl ListedEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }
}

/// Directory-enumeration capability used to scan the bucket root.
pub trait DirectoryLister: Sync {
    /// Lists the direct children of `path`. Order is unspecified.
    ///
    /// The outer error means `path` itself could not be listed; an inner
    /// error reports one child that could not be read.
    fn list(&self, path: &Path) -> io::Result<Vec<io::Result<ListedEntry>>>;
}

/// Lister backed by `std::fs::read_dir`.
///
/// Symlinks are reported as non-directories and never followed. Names that
/// are not valid UTF-8 are reported as `InvalidData` errors.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsDirectoryLister;

impl DirectoryLister for OsDirectoryLister {
    fn list(&self, path: &Path) -> io::Result<Vec<io::Result<ListedEntry>>> {
        let entries = fs::read_dir(path)?
            .map(|entry| -> io::Result<ListedEntry> {
                let entry = entry?;
                let is_dir = entry.file_type()?.is_dir();
                let name = entry.file_name().into_string().map_err(|name| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("name is not valid UTF-8: {}", name.to_string_lossy()),
                    )
                })?;
                Ok(ListedEntry { name, is_dir })
            })
            .collect();
        Ok(entries)
    }
}

/// A node in the tree built during walking.
#[derive(Debug)]
pub struct Node {
    /// Child nodes, sorted by name.
    pub children: Vec<Node>,
    pub name: EntryName,
    pub is_dir: bool,
}

impl Node {
    pub fn dir(name: EntryName, children: Vec<Node>) -> Self {
        Self {
            children,
            name,
            is_dir: true,
        }
    }

    pub fn leaf(name: EntryName) -> Self {
        Self {
            children: Vec::new(),
            name,
            is_dir: false,
        }
    }
}

/// Shared state for one walk.
#[derive(Debug)]
pub struct WalkData<'a> {
    pub num_files: AtomicUsize,
    /// Directories below the root.
    pub num_dirs: AtomicUsize,
    /// Entries skipped because they could not be listed or named.
    pub errors: AtomicUsize,
    pub root_path: &'a Path,
    pub ignored: &'a [PathBuf],
}

impl<'a> WalkData<'a> {
    pub fn new(root_path: &'a Path, ignored: &'a [PathBuf]) -> Self {
        Self {
            num_files: AtomicUsize::new(0),
            num_dirs: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            root_path,
            ignored,
        }
    }

    fn should_ignore(&self, path: &Path) -> bool {
        self.ignored
            .iter()
            .any(|ignored| path == ignored || path.starts_with(ignored))
    }

    fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// Walks the tree below `walk_data.root_path`.
///
/// The root must be listable. Unreadable directories further down are
/// logged, counted, and left empty; unreadable or unusable children are
/// logged, counted, and skipped.
pub fn walk_it<L: DirectoryLister>(lister: &L, walk_data: &WalkData) -> io::Result<Node> {
    let entries = lister.list(walk_data.root_path)?;
    Ok(walk_entries(
        lister,
        walk_data.root_path,
        EntryName::EMPTY,
        entries,
        walk_data,
    ))
}

fn walk_dir<L: DirectoryLister>(
    lister: &L,
    path: &Path,
    name: EntryName,
    walk_data: &WalkData,
) -> Node {
    match lister.list(path) {
        Ok(entries) => walk_entries(lister, path, name, entries, walk_data),
        Err(error) => {
            log::warn!("skipping unreadable directory {}: {error}", path.display());
            walk_data.record_error();
            Node::dir(name, Vec::new())
        }
    }
}

fn walk_entries<L: DirectoryLister>(
    lister: &L,
    path: &Path,
    name: EntryName,
    entries: Vec<io::Result<ListedEntry>>,
    walk_data: &WalkData,
) -> Node {
    let mut children: Vec<Node> = entries
        .into_par_iter()
        .filter_map(|entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    log::warn!("skipping entry in {}: {error}", path.display());
                    walk_data.record_error();
                    return None;
                }
            };
            let child_path = path.join(&entry.name);
            if walk_data.should_ignore(&child_path) {
                return None;
            }

            let child_name = match EntryName::new(&entry.name) {
                Ok(child_name) => child_name,
                Err(error) => {
                    log::warn!("skipping {}: {error}", child_path.display());
                    walk_data.record_error();
                    return None;
                }
            };

            if entry.is_dir {
                walk_data.num_dirs.fetch_add(1, Ordering::Relaxed);
                Some(walk_dir(lister, &child_path, child_name, walk_data))
            } else {
                walk_data.num_files.fetch_add(1, Ordering::Relaxed);
                Some(Node::leaf(child_name))
            }
        })
        .collect();

    children.sort_unstable_by(|a, b| a.name.cmp(&b.name));
    Node::dir(name, children)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs::File;
    use tempfile::TempDir;

    /// In-memory lister keyed by absolute directory path.
    #[derive(Debug, Default)]
    pub(crate) struct MemoryLister {
        dirs: HashMap<PathBuf, Vec<ListedEntry>>,
    }

    impl MemoryLister {
        pub(crate) fn with_dir(mut self, path: &str, entries: Vec<ListedEntry>) -> Self {
            self.dirs.insert(PathBuf::from(path), entries);
            self
        }
    }

    impl DirectoryLister for MemoryLister {
        fn list(&self, path: &Path) -> io::Result<Vec<io::Result<ListedEntry>>> {
            self.dirs
                .get(path)
                .map(|entries| entries.iter().cloned().map(Ok).collect())
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
        }
    }

    fn names(node: &Node) -> Vec<&str> {
        node.children.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn walk_sorts_unsorted_listing() {
        let lister = MemoryLister::default().with_dir(
            "/root",
            vec![
                ListedEntry::file("30000000"),
                ListedEntry::file("10000000"),
                ListedEntry::file("20000000"),
            ],
        );
        let walk_data = WalkData::new(Path::new("/root"), &[]);
        let root = walk_it(&lister, &walk_data).unwrap();

        assert!(root.is_dir);
        assert!(root.name.is_empty());
        assert_eq!(names(&root), vec!["10000000", "20000000", "30000000"]);
        assert_eq!(walk_data.num_files.load(Ordering::Relaxed), 3);
        assert_eq!(walk_data.num_dirs.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn walk_recurses_into_directories() {
        let lister = MemoryLister::default()
            .with_dir("/root", vec![ListedEntry::dir("ab"), ListedEntry::file("00")])
            .with_dir("/root/ab", vec![ListedEntry::file("cd")]);
        let walk_data = WalkData::new(Path::new("/root"), &[]);
        let root = walk_it(&lister, &walk_data).unwrap();

        assert_eq!(names(&root), vec!["00", "ab"]);
        let ab = &root.children[1];
        assert!(ab.is_dir);
        assert_eq!(names(ab), vec!["cd"]);
        assert_eq!(walk_data.num_dirs.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn walk_unreadable_subdirectory_is_counted() {
        let lister = MemoryLister::default().with_dir("/root", vec![ListedEntry::dir("gone")]);
        let walk_data = WalkData::new(Path::new("/root"), &[]);
        let root = walk_it(&lister, &walk_data).unwrap();

        assert_eq!(names(&root), vec!["gone"]);
        assert!(root.children[0].children.is_empty());
        assert_eq!(walk_data.errors.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn walk_unreadable_root_fails() {
        let lister = MemoryLister::default();
        let walk_data = WalkData::new(Path::new("/missing"), &[]);
        assert!(walk_it(&lister, &walk_data).is_err());
    }

    #[test]
    fn walk_skips_overlong_names_and_ignored_paths() {
        let long = "f".repeat(60);
        let lister = MemoryLister::default().with_dir(
            "/root",
            vec![
                ListedEntry::file(long),
                ListedEntry::dir("tmp"),
                ListedEntry::file("0a"),
            ],
        );
        let ignored = vec![PathBuf::from("/root/tmp")];
        let walk_data = WalkData::new(Path::new("/root"), &ignored);
        let root = walk_it(&lister, &walk_data).unwrap();

        assert_eq!(names(&root), vec!["0a"]);
        assert_eq!(walk_data.errors.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn os_lister_reports_kinds() {
        let temp = TempDir::new().unwrap();
        File::create(temp.path().join("0001")).unwrap();
        fs::create_dir(temp.path().join("ff")).unwrap();

        let mut entries: Vec<ListedEntry> = OsDirectoryLister
            .list(temp.path())
            .unwrap()
            .into_iter()
            .map(Result::unwrap)
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(
            entries,
            vec![ListedEntry::file("0001"), ListedEntry::dir("ff")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn walk_skips_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        File::create(temp.path().join(OsStr::from_bytes(b"00\xff"))).unwrap();
        File::create(temp.path().join("0001")).unwrap();

        let walk_data = WalkData::new(temp.path(), &[]);
        let root = walk_it(&OsDirectoryLister, &walk_data).unwrap();
        assert_eq!(names(&root), vec!["0001"]);
        assert_eq!(walk_data.errors.load(Ordering::Relaxed), 1);
        assert_eq!(walk_data.num_files.load(Ordering::Relaxed), 1);
    }
}
