//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;

use modwatch::watcher::Dispatcher;
use modwatch::{
    DirectoryWatcher, ModuleHandle, ModuleId, ModuleManager, RegistrationError, WatchSubscription,
};

/// Manager that records every call and fails or panics on demand.
#[derive(Default)]
pub struct FakeManager {
    next_id: AtomicU32,
    modules: DashMap<PathBuf, ModuleHandle>,
    failing: Mutex<HashSet<PathBuf>>,
    panicking: Mutex<HashSet<PathBuf>>,
    pub registers: AtomicUsize,
    pub unregisters: AtomicUsize,
    pub unregistered: Mutex<Vec<ModuleHandle>>,
}

impl FakeManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_on(&self, path: &Path) {
        self.failing.lock().insert(path.to_path_buf());
    }

    pub fn succeed_on(&self, path: &Path) {
        self.failing.lock().remove(path);
    }

    pub fn panic_on(&self, path: &Path) {
        self.panicking.lock().insert(path.to_path_buf());
    }

    pub fn register_calls(&self) -> usize {
        self.registers.load(Ordering::SeqCst)
    }

    pub fn unregister_calls(&self) -> usize {
        self.unregisters.load(Ordering::SeqCst)
    }

    pub fn is_registered(&self, path: &Path) -> bool {
        self.modules.contains_key(path)
    }

    pub fn registered_count(&self) -> usize {
        self.modules.len()
    }
}

impl ModuleManager for FakeManager {
    fn name(&self) -> &str {
        "fake"
    }

    fn try_register(&self, location: &Path) -> Result<ModuleHandle, RegistrationError> {
        self.registers.fetch_add(1, Ordering::SeqCst);

        if self.panicking.lock().contains(location) {
            panic!("manager blew up on {}", location.display());
        }
        if self.failing.lock().contains(location) {
            return Err(RegistrationError::Rejected {
                path: location.to_path_buf(),
                reason: "scripted failure".to_string(),
            });
        }

        let raw = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = ModuleHandle::new(ModuleId::new(raw).unwrap(), location);
        self.modules.insert(location.to_path_buf(), handle.clone());
        Ok(handle)
    }

    fn unregister(&self, handle: &ModuleHandle) {
        self.unregisters.fetch_add(1, Ordering::SeqCst);
        self.unregistered.lock().push(handle.clone());
        self.modules
            .remove_if(&handle.location, |_, current| current.id == handle.id);
    }

    fn lookup(&self, location: &Path) -> Option<ModuleHandle> {
        self.modules.get(location).map(|entry| entry.value().clone())
    }
}

/// Subscription that remembers every replacement it was asked for.
#[derive(Clone, Default)]
pub struct RecordingSubscription {
    pub calls: Arc<Mutex<Vec<(Vec<PathBuf>, Vec<PathBuf>)>>>,
}

impl RecordingSubscription {
    pub fn replacements(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn last(&self) -> Option<(Vec<PathBuf>, Vec<PathBuf>)> {
        self.calls.lock().last().cloned()
    }
}

impl WatchSubscription for RecordingSubscription {
    fn replace(&mut self, directories: &[PathBuf], files: &[PathBuf]) {
        self.calls
            .lock()
            .push((directories.to_vec(), files.to_vec()));
    }

    fn watched(&self) -> Vec<PathBuf> {
        self.last()
            .map(|(dirs, files)| dirs.into_iter().chain(files).collect())
            .unwrap_or_default()
    }
}

/// Engine wired to a fake manager and a recording subscription.
pub fn engine(manager: Arc<FakeManager>) -> (DirectoryWatcher, RecordingSubscription) {
    let subscription = RecordingSubscription::default();
    let dispatcher = Dispatcher::new(manager, 4).unwrap();
    let watcher = DirectoryWatcher::new(dispatcher, Box::new(subscription.clone()));
    (watcher, subscription)
}

/// Canonical path of a fresh subdirectory.
pub fn make_dir(root: &Path, name: &str) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::canonicalize(dir).unwrap()
}

#[cfg(unix)]
pub fn make_executable(dir: &Path, name: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

pub fn make_plain(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, "not a module").unwrap();
    path
}

/// Poll `check` until it holds or `timeout` elapses.
pub fn wait_for(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    check()
}
