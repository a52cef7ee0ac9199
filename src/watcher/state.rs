//! Authoritative record of watched directories and registered modules.
//!
//! One `WatchState` lives inside each engine. It is only mutated by a
//! reconciliation pass while the engine's pass lock is held.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::registry::ModuleHandle;

/// Watched directories plus the file-to-module mapping.
///
/// Every tracked file lives directly inside one of the watched directories.
#[derive(Debug, Default)]
pub struct WatchState {
    /// Canonical directory paths currently watched.
    directories: BTreeSet<PathBuf>,
    /// Registered modules keyed by file path. The key set is exactly the
    /// set of currently loaded files.
    modules: BTreeMap<PathBuf, ModuleHandle>,
}

impl WatchState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a directory is watched.
    pub fn is_watched(&self, dir: &Path) -> bool {
        self.directories.contains(dir)
    }

    /// Get all watched directories, sorted.
    pub fn directories(&self) -> impl Iterator<Item = &Path> {
        self.directories.iter().map(PathBuf::as_path)
    }

    /// Get all tracked files, sorted.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.modules.keys().map(PathBuf::as_path)
    }

    /// Check if a file has a registered module.
    pub fn contains_file(&self, path: &Path) -> bool {
        self.modules.contains_key(path)
    }

    /// Get the module registered for a file.
    pub fn module(&self, path: &Path) -> Option<&ModuleHandle> {
        self.modules.get(path)
    }

    /// Tracked files whose parent directory is exactly `dir`.
    pub fn files_in(&self, dir: &Path) -> Vec<PathBuf> {
        self.modules
            .keys()
            .filter(|file| file.parent() == Some(dir))
            .cloned()
            .collect()
    }

    /// Get count of watched directories.
    pub fn dir_count(&self) -> usize {
        self.directories.len()
    }

    /// Get count of tracked files.
    pub fn file_count(&self) -> usize {
        self.modules.len()
    }

    /// Record a module for a file, returning the handle it replaced.
    pub(crate) fn insert_module(
        &mut self,
        path: PathBuf,
        handle: ModuleHandle,
    ) -> Option<ModuleHandle> {
        self.modules.insert(path, handle)
    }

    /// Stop tracking a file.
    pub(crate) fn remove_module(&mut self, path: &Path) -> Option<ModuleHandle> {
        self.modules.remove(path)
    }

    /// Replace the watched directory set.
    pub(crate) fn replace_directories(&mut self, dirs: impl IntoIterator<Item = PathBuf>) {
        self.directories = dirs.into_iter().collect();
    }

    /// Drop everything.
    pub(crate) fn clear(&mut self) {
        self.directories.clear();
        self.modules.clear();
    }
}
