mod events;
mod walker;

pub use events::{apply_path_change, create_bucket_watcher, drain_events, WatcherEvent};
pub use walker::{coalesce_event_paths, path_is_ignored};
