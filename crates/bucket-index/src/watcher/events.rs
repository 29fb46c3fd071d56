//! Filesystem change feed for a bucket cache.
//!
//! The notify callback only forwards events through a crossbeam channel. The
//! thread owning the cache drains the channel and applies the changes, so
//! the cache keeps a single writer.

use std::io;
use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, Sender};
use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::walker::{coalesce_event_paths, path_is_ignored};
use crate::cache::FileSystemCache;
use crate::error::{BucketIndexError, Result};
use crate::indexer::{DirectoryLister, OsDirectoryLister};

/// An event sent from the watcher to the owner of the cache.
#[derive(Debug)]
pub enum WatcherEvent {
    /// Paths that were created, modified, renamed or removed.
    PathsChanged(Vec<PathBuf>),
    /// The backend lost track of changes; the whole tree must be rebuilt.
    RescanRequired,
    /// The watcher reported an error.
    Error(String),
}

/// Starts watching `root` recursively.
///
/// Events go to `event_tx` until the returned watcher is dropped.
pub fn create_bucket_watcher(
    root: &Path,
    event_tx: Sender<WatcherEvent>,
) -> Result<RecommendedWatcher> {
    let mut watcher =
        recommended_watcher(move |event_result: notify::Result<Event>| match event_result {
            Ok(event) => {
                if matches!(event.kind, EventKind::Access(_)) {
                    return;
                }
                let message = if event.paths.is_empty() {
                    WatcherEvent::RescanRequired
                } else {
                    WatcherEvent::PathsChanged(event.paths)
                };
                let _ = event_tx.send(message);
            }
            Err(error) => {
                let _ = event_tx.send(WatcherEvent::Error(error.to_string()));
            }
        })
        .map_err(|error| {
            BucketIndexError::Watcher(format!(
                "failed to create watcher for {}: {error}",
                root.display()
            ))
        })?;

    watcher
        .watch(root, RecursiveMode::Recursive)
        .map_err(|error| {
            BucketIndexError::Watcher(format!("failed to watch {}: {error}", root.display()))
        })?;

    Ok(watcher)
}

/// Applies every pending event without blocking.
///
/// Path batches are coalesced before they are applied. A path that cannot
/// be indexed (for example a name over the length bound) is logged and
/// skipped; any other failure is logged and answered with a full rescan
/// once the rest of the batch is applied. Returns the number of paths
/// applied.
pub fn drain_events(cache: &mut FileSystemCache, event_rx: &Receiver<WatcherEvent>) -> Result<usize> {
    let mut changed = Vec::new();
    let mut rescan = false;
    for event in event_rx.try_iter() {
        match event {
            WatcherEvent::PathsChanged(paths) => changed.extend(paths),
            WatcherEvent::RescanRequired => rescan = true,
            WatcherEvent::Error(message) => log::warn!("bucket watcher error: {message}"),
        }
    }

    if rescan {
        cache.rescan()?;
        return Ok(0);
    }

    let mut applied = 0;
    let mut failed = false;
    for path in coalesce_event_paths(changed) {
        match apply_path_change(cache, &path) {
            Ok(()) => applied += 1,
            Err(error) if error.is_entry_error() => {
                log::warn!("skipping change to {}: {error}", path.display());
            }
            Err(error) => {
                log::warn!("failed to apply change to {}: {error}", path.display());
                failed = true;
            }
        }
    }
    if failed {
        cache.rescan()?;
    }
    Ok(applied)
}

/// Brings the cache in line with the current state of `changed_path`.
pub fn apply_path_change(cache: &mut FileSystemCache, changed_path: &Path) -> Result<()> {
    let Some(path) = changed_path.to_str() else {
        log::warn!("ignoring non UTF-8 path {}", changed_path.display());
        return Ok(());
    };
    let Ok(relative) = cache.relative_path(path) else {
        log::debug!("ignoring change outside bucket root: {path}");
        return Ok(());
    };
    if relative.is_empty() {
        return cache.rescan();
    }
    if path_is_ignored(cache.ignored(), changed_path) {
        return remove_quietly(cache, path);
    }

    match changed_path.symlink_metadata() {
        Ok(metadata) if metadata.is_dir() => {
            remove_quietly(cache, path)?;
            upsert_dir_recursive(cache, changed_path)
        }
        Ok(_) => match cache.add_file(path) {
            // A directory was replaced by a file
            Err(BucketIndexError::NotADirectory(_)) => {
                remove_quietly(cache, path)?;
                cache.add_file(path)
            }
            result => result,
        },
        Err(error) if error.kind() == io::ErrorKind::NotFound => remove_quietly(cache, path),
        Err(error) => Err(error.into()),
    }
}

fn upsert_dir_recursive(cache: &mut FileSystemCache, dir: &Path) -> Result<()> {
    if path_is_ignored(cache.ignored(), dir) {
        return Ok(());
    }
    let Some(dir_path) = dir.to_str() else {
        return Ok(());
    };
    cache.add_directory(dir_path)?;

    let entries = match OsDirectoryLister.list(dir) {
        Ok(entries) => entries,
        // Removed again before we got to it
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(error) => return Err(error.into()),
    };
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                log::warn!("skipping entry in {}: {error}", dir.display());
                continue;
            }
        };
        let child = dir.join(&entry.name);
        if path_is_ignored(cache.ignored(), &child) {
            continue;
        }
        let result = if entry.is_dir {
            upsert_dir_recursive(cache, &child)
        } else {
            match child.to_str() {
                Some(child_path) => cache.add_file(child_path),
                None => Ok(()),
            }
        };
        match result {
            Err(error) if error.is_entry_error() => {
                log::warn!("skipping {}: {error}", child.display());
            }
            other => other?,
        }
    }
    Ok(())
}

fn remove_quietly(cache: &mut FileSystemCache, path: &str) -> Result<()> {
    match cache.delete_file(path) {
        Ok(_) => Ok(()),
        Err(BucketIndexError::MissingAncestor(_)) => {
            log::debug!("no indexed ancestor for removed path {path}");
            Ok(())
        }
        Err(error) => Err(error),
    }
}
