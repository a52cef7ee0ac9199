//! Change notifications consumed by the engine.
//!
//! OS watchers report the child path that changed rather than "this
//! directory changed", so raw `notify` events are routed against the
//! current [`WatchState`] before they reach the engine.

use std::fmt;
use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{Event, EventKind};

use super::state::WatchState;

/// A change the engine knows how to reconcile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WatchEvent {
    /// A tracked file's content changed and it should be re-registered.
    FileChanged(PathBuf),
    /// A watched directory's entries changed.
    DirectoryChanged(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::FileChanged(path) | WatchEvent::DirectoryChanged(path) => path,
        }
    }
}

impl fmt::Display for WatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchEvent::FileChanged(path) => write!(f, "file changed: {}", path.display()),
            WatchEvent::DirectoryChanged(path) => {
                write!(f, "directory changed: {}", path.display())
            }
        }
    }
}

/// Translate a raw notification into engine events.
///
/// - access events are ignored
/// - content writes to a tracked file become `FileChanged`
/// - anything touching a watched directory itself becomes `DirectoryChanged`
/// - other changes to a direct child of a watched directory become
///   `DirectoryChanged` for that directory
pub fn route(event: &Event, state: &WatchState) -> Vec<WatchEvent> {
    if matches!(event.kind, EventKind::Access(_)) {
        return Vec::new();
    }

    let content_write = matches!(
        event.kind,
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any)
    );

    let mut routed = Vec::new();
    for path in &event.paths {
        let routed_event = if content_write && state.contains_file(path) {
            Some(WatchEvent::FileChanged(path.clone()))
        } else if state.is_watched(path) {
            Some(WatchEvent::DirectoryChanged(path.clone()))
        } else {
            path.parent()
                .filter(|parent| state.is_watched(parent))
                .map(|parent| WatchEvent::DirectoryChanged(parent.to_path_buf()))
        };

        match routed_event {
            Some(e) if !routed.contains(&e) => routed.push(e),
            Some(_) => {}
            None => {
                crate::debug_event!("watcher", "unmatched", "{:?} {}", event.kind, path.display());
            }
        }
    }

    routed
}
