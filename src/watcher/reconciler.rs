//! Diffing desired directories against the current watch state.
//!
//! Planning is pure set arithmetic over [`WatchState`] plus a scan of each
//! desired directory. Directories are independent: a directory's plan only
//! ever touches files whose parent is that directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::dispatcher::Dispatcher;
use super::scanner::executables_in;
use super::state::WatchState;

/// Files to unregister and files to register for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub unload: Vec<PathBuf>,
    pub load: Vec<PathBuf>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.unload.is_empty() && self.load.is_empty()
    }
}

/// Outcome of applying a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Files that were registered.
    pub loaded: Vec<PathBuf>,
    /// Files the manager refused to register.
    pub failed: Vec<PathBuf>,
    /// Files that stopped being tracked.
    pub unloaded: Vec<PathBuf>,
}

impl ReconcileReport {
    /// True when the pass changed nothing and attempted nothing.
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty() && self.failed.is_empty() && self.unloaded.is_empty()
    }
}

/// Plan a full pass against a new desired directory list.
///
/// `desired` is expected to be filtered already. Duplicate entries are
/// planned once.
pub fn plan_full(state: &WatchState, desired: &[PathBuf]) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();
    let desired_set: HashSet<&Path> = desired.iter().map(PathBuf::as_path).collect();

    // Directories being dropped entirely
    for dir in state.directories() {
        if !desired_set.contains(dir) {
            plan.unload.extend(state.files_in(dir));
        }
    }

    let mut seen = HashSet::new();
    for dir in desired {
        if seen.insert(dir.as_path()) {
            diff_directory(state, dir, &mut plan);
        }
    }

    plan
}

/// Plan a pass restricted to one directory.
///
/// An unwatched directory is treated as newly watched.
pub fn plan_directory(state: &WatchState, dir: &Path) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();
    diff_directory(state, dir, &mut plan);
    plan
}

/// Symmetric difference between tracked files and executables on disk,
/// scoped to `dir`.
fn diff_directory(state: &WatchState, dir: &Path, plan: &mut ReconcilePlan) {
    let executables = executables_in(dir);

    if !state.is_watched(dir) {
        plan.load.extend(executables);
        return;
    }

    let tracked = state.files_in(dir);
    let on_disk: HashSet<&PathBuf> = executables.iter().collect();
    let tracked_set: HashSet<&PathBuf> = tracked.iter().collect();

    plan.unload.extend(
        tracked
            .iter()
            .filter(|file| !on_disk.contains(file))
            .cloned(),
    );
    plan.load.extend(
        executables
            .iter()
            .filter(|file| !tracked_set.contains(file))
            .cloned(),
    );
}

/// Apply a plan: the whole unload batch completes before the load batch starts.
pub(crate) fn apply(
    state: &mut WatchState,
    dispatcher: &Dispatcher,
    plan: ReconcilePlan,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    if !plan.unload.is_empty() {
        dispatcher.unload(state, &plan.unload);
        report.unloaded = plan.unload;
    }

    if !plan.load.is_empty() {
        let handles = dispatcher.load(state, &plan.load);
        for (path, handle) in plan.load.into_iter().zip(handles) {
            match handle {
                Some(_) => report.loaded.push(path),
                None => report.failed.push(path),
            }
        }
    }

    report
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::registry::{ModuleHandle, ModuleId};
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn executable(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn canonical_dir() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().canonicalize().unwrap();
        (temp_dir, path)
    }

    fn track(state: &mut WatchState, path: &Path, id: u32) {
        state.insert_module(
            path.to_path_buf(),
            ModuleHandle::new(ModuleId::new(id).unwrap(), path),
        );
    }

    #[test]
    fn test_new_directory_loads_everything() {
        let (_guard, dir) = canonical_dir();
        let a = executable(&dir, "a");
        let b = executable(&dir, "b");

        let plan = plan_full(&WatchState::new(), std::slice::from_ref(&dir));

        assert!(plan.unload.is_empty());
        assert_eq!(plan.load, vec![a, b]);
    }

    #[test]
    fn test_dropped_directory_unloads_its_files() {
        let (_guard_a, dir_a) = canonical_dir();
        let (_guard_b, dir_b) = canonical_dir();
        let a = executable(&dir_a, "a");
        let b = executable(&dir_b, "b");

        let mut state = WatchState::new();
        state.replace_directories(vec![dir_a.clone(), dir_b.clone()]);
        track(&mut state, &a, 1);
        track(&mut state, &b, 2);

        let plan = plan_full(&state, std::slice::from_ref(&dir_b));

        assert_eq!(plan.unload, vec![a]);
        assert!(plan.load.is_empty());
    }

    #[test]
    fn test_watched_directory_symmetric_difference() {
        let (_guard, dir) = canonical_dir();
        let kept = executable(&dir, "kept");
        let added = executable(&dir, "added");
        let removed = dir.join("removed");

        let mut state = WatchState::new();
        state.replace_directories(vec![dir.clone()]);
        track(&mut state, &kept, 1);
        track(&mut state, &removed, 2);

        let plan = plan_directory(&state, &dir);

        assert_eq!(plan.unload, vec![removed]);
        assert_eq!(plan.load, vec![added]);
    }

    #[test]
    fn test_replaced_with_non_executable_counts_as_removed() {
        let (_guard, dir) = canonical_dir();
        let tool = executable(&dir, "tool");

        let mut state = WatchState::new();
        state.replace_directories(vec![dir.clone()]);
        track(&mut state, &tool, 1);

        fs::set_permissions(&tool, fs::Permissions::from_mode(0o644)).unwrap();

        let plan = plan_directory(&state, &dir);
        assert_eq!(plan.unload, vec![tool]);
        assert!(plan.load.is_empty());
    }

    #[test]
    fn test_vanished_directory_unloads_tracked_files() {
        let (guard, dir) = canonical_dir();
        let tool = executable(&dir, "tool");

        let mut state = WatchState::new();
        state.replace_directories(vec![dir.clone()]);
        track(&mut state, &tool, 1);

        drop(guard);

        let plan = plan_full(&state, std::slice::from_ref(&dir));
        assert_eq!(plan.unload, vec![tool]);
        assert!(plan.load.is_empty());
    }

    #[test]
    fn test_converged_state_plans_nothing() {
        let (_guard, dir) = canonical_dir();
        let tool = executable(&dir, "tool");

        let mut state = WatchState::new();
        state.replace_directories(vec![dir.clone()]);
        track(&mut state, &tool, 1);

        assert!(plan_full(&state, std::slice::from_ref(&dir)).is_empty());
    }

    #[test]
    fn test_duplicate_desired_directory_planned_once() {
        let (_guard, dir) = canonical_dir();
        let tool = executable(&dir, "tool");

        let plan = plan_full(&WatchState::new(), &[dir.clone(), dir.clone()]);
        assert_eq!(plan.load, vec![tool]);
    }
}
