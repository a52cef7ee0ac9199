//! Concurrent load/unload batches against the module manager.
//!
//! Each batch fans out over a dedicated rayon pool and returns only when
//! every unit has finished. Results are folded into [`WatchState`] after
//! the barrier, so state mutation stays single-writer even though manager
//! calls run concurrently.
//!
//! There is no per-registration timeout. A manager call that never returns
//! blocks its batch, and with it the engine's pass lock.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::registry::{ModuleHandle, ModuleManager};

use super::error::WatchError;
use super::state::WatchState;

/// Runs registration batches for one engine.
pub struct Dispatcher {
    manager: Arc<dyn ModuleManager>,
    pool: ThreadPool,
    debug: AtomicBool,
}

impl Dispatcher {
    /// Create a dispatcher with `threads` workers (at least one).
    pub fn new(manager: Arc<dyn ModuleManager>, threads: usize) -> Result<Self, WatchError> {
        let threads = threads.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("modwatch-dispatch-{i}"))
            .build()
            .map_err(|e| WatchError::InitFailed {
                reason: format!("Failed to build dispatch pool: {e}"),
            })?;

        crate::debug_event!("dispatch", "pool ready", "{threads} threads");

        Ok(Self {
            manager,
            pool,
            debug: AtomicBool::new(false),
        })
    }

    pub fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::Relaxed);
    }

    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    /// Register every path concurrently.
    ///
    /// Returns one entry per input path, in input order; `None` marks a
    /// failed registration. Successful handles are recorded in `state`.
    pub fn load(&self, state: &mut WatchState, paths: &[PathBuf]) -> Vec<Option<ModuleHandle>> {
        if paths.is_empty() {
            return Vec::new();
        }

        let results = self.register_all(paths);

        for (path, result) in paths.iter().zip(&results) {
            if let Some(handle) = result {
                state.insert_module(path.clone(), handle.clone());
            }
        }

        results
    }

    /// Unregister every tracked path concurrently, then stop tracking all of them.
    ///
    /// Entries are removed whether or not the manager call succeeded.
    /// Untracked paths are ignored. Returns the number of manager calls made.
    pub fn unload(&self, state: &mut WatchState, paths: &[PathBuf]) -> usize {
        let handles: Vec<ModuleHandle> = paths
            .iter()
            .filter_map(|path| state.module(path).cloned())
            .collect();

        if !handles.is_empty() {
            let manager = self.manager.as_ref();
            let debug = self.is_debug();
            self.pool.install(|| {
                handles
                    .par_iter()
                    .for_each(|handle| unregister_one(manager, handle, debug));
            });
        }

        for path in paths {
            state.remove_module(path);
        }

        handles.len()
    }

    /// Re-register a single file, overwriting whatever was tracked for it.
    ///
    /// On failure the stale handle is dropped from `state` and released
    /// from the manager, leaving the file untracked.
    pub fn reload(&self, state: &mut WatchState, path: &Path) -> Option<ModuleHandle> {
        let result = self
            .register_all(std::slice::from_ref(&path.to_path_buf()))
            .pop()
            .flatten();

        match &result {
            Some(handle) => {
                state.insert_module(path.to_path_buf(), handle.clone());
            }
            None => {
                if let Some(stale) = state.remove_module(path) {
                    unregister_one(self.manager.as_ref(), &stale, self.is_debug());
                }
            }
        }

        result
    }

    fn register_all(&self, paths: &[PathBuf]) -> Vec<Option<ModuleHandle>> {
        let manager = self.manager.as_ref();
        let debug = self.is_debug();

        self.pool.install(|| {
            paths
                .par_iter()
                .map(|path| register_one(manager, path, debug))
                .collect()
        })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("manager", &self.manager.name())
            .field("threads", &self.thread_count())
            .field("debug", &self.is_debug())
            .finish()
    }
}

/// One registration attempt. Errors and panics both resolve to `None`.
fn register_one(manager: &dyn ModuleManager, path: &Path, debug: bool) -> Option<ModuleHandle> {
    match panic::catch_unwind(AssertUnwindSafe(|| manager.try_register(path))) {
        Ok(Ok(handle)) => {
            crate::debug_event!(manager.name(), "registered", "{} {}", handle.id, path.display());
            Some(handle)
        }
        Ok(Err(e)) => {
            if debug {
                tracing::warn!("[{}] {e}", manager.name());
            }
            None
        }
        Err(payload) => {
            if debug {
                tracing::warn!(
                    "[{}] registering {} panicked: {}",
                    manager.name(),
                    path.display(),
                    panic_message(payload.as_ref())
                );
            }
            None
        }
    }
}

fn unregister_one(manager: &dyn ModuleManager, handle: &ModuleHandle, debug: bool) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| manager.unregister(handle)));
    match outcome {
        Ok(()) => {
            crate::debug_event!(
                manager.name(),
                "unregistered",
                "{} {}",
                handle.id,
                handle.location.display()
            );
        }
        Err(payload) => {
            if debug {
                tracing::warn!(
                    "[{}] unregistering {} panicked: {}",
                    manager.name(),
                    handle.location.display(),
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
