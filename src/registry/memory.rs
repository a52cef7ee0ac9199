//! In-process module manager.
//!
//! Accepts any existing executable regular file and hands out sequential
//! ids. Used by the CLI and by embedders that only need to know which
//! executables are present.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;

use crate::watcher::scanner::is_executable;

use super::{ModuleHandle, ModuleId, ModuleManager, RegistrationError};

/// Thread-safe registry of executable modules keyed by location.
#[derive(Debug, Default)]
pub struct InMemoryModuleManager {
    modules: DashMap<PathBuf, ModuleHandle>,
    next_id: AtomicU32,
}

impl InMemoryModuleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get count of registered modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// All registered modules, sorted by location.
    pub fn modules(&self) -> Vec<ModuleHandle> {
        let mut modules: Vec<ModuleHandle> =
            self.modules.iter().map(|entry| entry.value().clone()).collect();
        modules.sort_by(|a, b| a.location.cmp(&b.location));
        modules
    }

    fn allocate_id(&self) -> ModuleId {
        loop {
            let raw = self.next_id.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
            if let Some(id) = ModuleId::new(raw) {
                return id;
            }
        }
    }
}

impl ModuleManager for InMemoryModuleManager {
    fn name(&self) -> &str {
        "memory"
    }

    fn try_register(&self, location: &Path) -> Result<ModuleHandle, RegistrationError> {
        let metadata = std::fs::metadata(location).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RegistrationError::NotFound {
                path: location.to_path_buf(),
            },
            _ => RegistrationError::Io {
                path: location.to_path_buf(),
                source: e,
            },
        })?;

        if !metadata.is_file() || !is_executable(location) {
            return Err(RegistrationError::NotExecutable {
                path: location.to_path_buf(),
            });
        }

        let handle = ModuleHandle::new(self.allocate_id(), location);
        self.modules.insert(location.to_path_buf(), handle.clone());
        Ok(handle)
    }

    fn unregister(&self, handle: &ModuleHandle) {
        // Only drop the entry if it still belongs to this handle
        self.modules
            .remove_if(&handle.location, |_, current| current.id == handle.id);
    }

    fn lookup(&self, location: &Path) -> Option<ModuleHandle> {
        self.modules.get(location).map(|entry| entry.value().clone())
    }
}
