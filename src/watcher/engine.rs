//! The reconciliation engine.
//!
//! [`DirectoryWatcher`] owns the [`WatchState`], the dispatcher and the
//! subscription. Every reconciliation pass (a new directory list, a
//! directory change, a file change) runs under one lock, so passes never
//! interleave their state mutations and a caller that starts a pass while
//! another is running waits for it to finish.

use std::path::{Path, PathBuf};

use notify::Event;
use parking_lot::Mutex;

use crate::registry::ModuleHandle;

use super::dispatcher::Dispatcher;
use super::event::{self, WatchEvent};
use super::path_filter;
use super::reconciler::{self, ReconcileReport};
use super::state::WatchState;
use super::subscription::WatchSubscription;

struct Inner {
    state: WatchState,
    subscription: Box<dyn WatchSubscription>,
}

impl Inner {
    /// Hand the full directory and file set to the subscription if either changed.
    fn resync(&mut self, dirs_before: &[PathBuf], files_before: &[PathBuf]) {
        let dirs = collect(self.state.directories());
        let files = collect(self.state.files());

        if dirs != dirs_before || files != files_before {
            self.subscription.replace(&dirs, &files);
        }
    }

    fn snapshot(&self) -> (Vec<PathBuf>, Vec<PathBuf>) {
        (
            collect(self.state.directories()),
            collect(self.state.files()),
        )
    }
}

fn collect<'a>(paths: impl Iterator<Item = &'a Path>) -> Vec<PathBuf> {
    paths.map(Path::to_path_buf).collect()
}

/// Keeps registered modules in sync with a set of watched directories.
pub struct DirectoryWatcher {
    dispatcher: Dispatcher,
    inner: Mutex<Inner>,
}

impl DirectoryWatcher {
    /// Create an engine with no watched directories.
    pub fn new(dispatcher: Dispatcher, subscription: Box<dyn WatchSubscription>) -> Self {
        Self {
            dispatcher,
            inner: Mutex::new(Inner {
                state: WatchState::new(),
                subscription,
            }),
        }
    }

    /// Toggle verbose reporting of registration failures.
    pub fn set_debug(&self, debug: bool) {
        self.dispatcher.set_debug(debug);
    }

    pub fn is_debug(&self) -> bool {
        self.dispatcher.is_debug()
    }

    /// Replace the watched directory list and reconcile every directory.
    ///
    /// Blank and non-existent entries are dropped. The filtered list becomes
    /// the watched set even if some registrations fail.
    pub fn set_directories<I, P>(&self, directories: I) -> ReconcileReport
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let desired = path_filter::filter_directories(directories);

        let mut inner = self.inner.lock();
        let (dirs_before, files_before) = inner.snapshot();

        let plan = reconciler::plan_full(&inner.state, &desired);
        let report = reconciler::apply(&mut inner.state, &self.dispatcher, plan);
        inner.state.replace_directories(desired);
        inner.resync(&dirs_before, &files_before);

        crate::log_event!(
            "watcher",
            "directories set",
            "{} directories, {} modules ({} loaded, {} failed, {} unloaded)",
            inner.state.dir_count(),
            inner.state.file_count(),
            report.loaded.len(),
            report.failed.len(),
            report.unloaded.len()
        );

        report
    }

    /// Currently watched directories, sorted.
    pub fn directories(&self) -> Vec<PathBuf> {
        collect(self.inner.lock().state.directories())
    }

    /// Currently tracked module files, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        collect(self.inner.lock().state.files())
    }

    /// Module registered for `path`, if tracked.
    pub fn module(&self, path: &Path) -> Option<ModuleHandle> {
        self.inner.lock().state.module(path).cloned()
    }

    /// Paths the subscription currently watches.
    pub fn subscribed(&self) -> Vec<PathBuf> {
        self.inner.lock().subscription.watched()
    }

    /// Translate a raw notification against the current state.
    pub fn route(&self, event: &Event) -> Vec<WatchEvent> {
        event::route(event, &self.inner.lock().state)
    }

    /// Run the reconciliation a change notification calls for.
    ///
    /// Returns `None` when the event was ignored.
    pub fn handle_event(&self, event: WatchEvent) -> Option<ReconcileReport> {
        match event {
            WatchEvent::FileChanged(path) => self.reload_file(&path),
            WatchEvent::DirectoryChanged(path) => self.reconcile_directory(&path, false),
        }
    }

    /// Like [`handle_event`](Self::handle_event), for events routed against
    /// an earlier state.
    ///
    /// A directory event is dropped if the directory stopped being watched
    /// since the event was routed.
    pub(crate) fn handle_routed_event(&self, event: WatchEvent) -> Option<ReconcileReport> {
        match event {
            WatchEvent::FileChanged(path) => self.reload_file(&path),
            WatchEvent::DirectoryChanged(path) => self.reconcile_directory(&path, true),
        }
    }

    /// Re-register one file, replacing its handle even when registration fails.
    fn reload_file(&self, path: &Path) -> Option<ReconcileReport> {
        let mut inner = self.inner.lock();

        let parent_watched = path
            .parent()
            .is_some_and(|parent| inner.state.is_watched(parent));
        if !parent_watched {
            crate::debug_event!("watcher", "stale file event", "{}", path.display());
            return None;
        }

        let (dirs_before, files_before) = inner.snapshot();
        let mut report = ReconcileReport::default();

        match self.dispatcher.reload(&mut inner.state, path) {
            Some(handle) => {
                if self.is_debug() {
                    crate::log_event!("watcher", "reloaded", "{} {}", handle.id, path.display());
                }
                report.loaded.push(path.to_path_buf());
            }
            None => {
                if self.is_debug() {
                    tracing::warn!("[watcher] failed to reload module {}", path.display());
                }
                report.failed.push(path.to_path_buf());
            }
        }

        inner.resync(&dirs_before, &files_before);
        Some(report)
    }

    /// Targeted reconciliation of one directory.
    ///
    /// A directory that no longer exists is ignored rather than dropped;
    /// only [`set_directories`](Self::set_directories) removes directories.
    fn reconcile_directory(&self, path: &Path, watched_only: bool) -> Option<ReconcileReport> {
        let Some(dir) = path_filter::valid_directory(path) else {
            if self.is_debug() {
                tracing::warn!(
                    "[watcher] ignoring change in {}: no longer a directory",
                    path.display()
                );
            }
            return None;
        };

        let mut inner = self.inner.lock();
        if watched_only && !inner.state.is_watched(&dir) {
            crate::debug_event!("watcher", "stale directory event", "{}", dir.display());
            return None;
        }
        let (dirs_before, files_before) = inner.snapshot();

        let plan = reconciler::plan_directory(&inner.state, &dir);
        let report = reconciler::apply(&mut inner.state, &self.dispatcher, plan);

        if !inner.state.is_watched(&dir) {
            let mut dirs = dirs_before.clone();
            dirs.push(dir.clone());
            inner.state.replace_directories(dirs);
        }
        inner.resync(&dirs_before, &files_before);

        if self.is_debug() {
            crate::log_event!("watcher", "reloaded modules", "{}", dir.display());
        }
        crate::debug_event!(
            "watcher",
            "directory pass",
            "{} loaded, {} failed, {} unloaded",
            report.loaded.len(),
            report.failed.len(),
            report.unloaded.len()
        );

        Some(report)
    }

    /// Stop watching everything and forget all tracked modules.
    ///
    /// Registered modules are left with the manager.
    pub fn teardown(&self) {
        let mut inner = self.inner.lock();
        inner.subscription.replace(&[], &[]);
        inner.state.clear();
        crate::debug_event!("watcher", "torn down");
    }
}

impl std::fmt::Debug for DirectoryWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("DirectoryWatcher")
            .field("dispatcher", &self.dispatcher)
            .field("directories", &inner.state.dir_count())
            .field("files", &inner.state.file_count())
            .finish()
    }
}
