//! Adapter to the filesystem notification source.
//!
//! The engine never diffs subscriptions. Every time its directory or file
//! set changes it hands the complete new set to [`WatchSubscription::replace`].

use std::path::{Path, PathBuf};

use crossbeam_channel::Sender;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

use super::error::WatchError;

/// Something that can be told which paths to watch.
pub trait WatchSubscription: Send {
    /// Unsubscribe everything, then subscribe `directories` and `files`.
    fn replace(&mut self, directories: &[PathBuf], files: &[PathBuf]);

    /// Paths currently subscribed.
    fn watched(&self) -> Vec<PathBuf>;
}

/// Subscription backed by `notify::RecommendedWatcher`.
///
/// Raw events are forwarded to an unbounded channel so a slow consumer
/// never stalls the OS watcher thread.
pub struct NotifySubscription {
    watcher: RecommendedWatcher,
    watched: Vec<PathBuf>,
}

impl NotifySubscription {
    /// Create a subscription that forwards raw events to `sender`.
    pub fn new(sender: Sender<notify::Result<Event>>) -> Result<Self, WatchError> {
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = sender.send(res);
        })?;

        Ok(Self {
            watcher,
            watched: Vec::new(),
        })
    }

    fn watch_path(&mut self, path: &Path) -> Result<(), WatchError> {
        self.watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }
}

impl WatchSubscription for NotifySubscription {
    fn replace(&mut self, directories: &[PathBuf], files: &[PathBuf]) {
        for path in std::mem::take(&mut self.watched) {
            if let Err(e) = self.watcher.unwatch(&path) {
                // Already gone from disk; the OS dropped the watch itself
                crate::debug_event!("subscription", "unwatch failed", "{}: {e}", path.display());
            }
        }

        for path in directories.iter().chain(files) {
            match self.watch_path(path) {
                Ok(()) => self.watched.push(path.clone()),
                Err(e) => tracing::warn!("[subscription] {e}"),
            }
        }

        crate::debug_event!(
            "subscription",
            "replaced",
            "{} directories, {} files",
            directories.len(),
            files.len()
        );
    }

    fn watched(&self) -> Vec<PathBuf> {
        self.watched.clone()
    }
}
