//! Path helpers for change batches.

use std::path::{Path, PathBuf};

use fnv::FnvHashSet;

/// Checks if a path is one of the ignored paths or below one.
pub fn path_is_ignored(ignored: &[PathBuf], candidate: &Path) -> bool {
    ignored.iter().any(|path| candidate.starts_with(path))
}

/// Reduces a batch of changed paths to the smallest set whose re-examination
/// covers every change.
///
/// Duplicates collapse and any path below another path of the batch is
/// dropped. The result is ordered by depth, then by path.
///
/// ```text
/// ["/r/ab/cd", "/r/ab", "/r/ab/ef", "/r/ff"]  ->  ["/r/ab", "/r/ff"]
/// ```
pub fn coalesce_event_paths(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
    if paths.len() <= 1 {
        return paths;
    }

    paths.sort_by_cached_key(|path| (path.components().count(), path.clone()));
    paths.dedup();

    let mut selected: FnvHashSet<PathBuf> = FnvHashSet::default();
    paths.retain(|path| {
        // `ancestors` starts at the path itself, so shallower entries are
        // already in the set when a descendant is checked.
        if path.ancestors().any(|ancestor| selected.contains(ancestor)) {
            return false;
        }
        selected.insert(path.clone());
        true
    });
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(list: &[&str]) -> Vec<PathBuf> {
        list.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn coalesce_keeps_single_path() {
        assert_eq!(coalesce_event_paths(paths(&["/r/a"])), paths(&["/r/a"]));
        assert!(coalesce_event_paths(Vec::new()).is_empty());
    }

    #[test]
    fn coalesce_drops_descendants_and_duplicates() {
        let result = coalesce_event_paths(paths(&[
            "/r/ab/cd",
            "/r/ab",
            "/r/ab/ef",
            "/r/ff",
            "/r/ff",
        ]));
        assert_eq!(result, paths(&["/r/ab", "/r/ff"]));
    }

    #[test]
    fn coalesce_is_component_aware() {
        let result = coalesce_event_paths(paths(&["/r/ab", "/r/abc/01"]));
        assert_eq!(result, paths(&["/r/ab", "/r/abc/01"]));
    }

    #[test]
    fn coalesce_orders_by_depth() {
        let result = coalesce_event_paths(paths(&["/r/b/c/d", "/r/z", "/r/a/b"]));
        assert_eq!(result, paths(&["/r/z", "/r/a/b", "/r/b/c/d"]));
    }

    #[test]
    fn ignored_paths_cover_descendants() {
        let ignored = paths(&["/r/tmp"]);
        assert!(path_is_ignored(&ignored, Path::new("/r/tmp")));
        assert!(path_is_ignored(&ignored, Path::new("/r/tmp/00")));
        assert!(!path_is_ignored(&ignored, Path::new("/r/tmpx")));
    }
}
