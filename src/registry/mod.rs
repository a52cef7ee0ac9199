//! Module manager seam.
//!
//! The reconciliation engine never loads anything itself. It hands file
//! locations to a [`ModuleManager`] and keeps whatever [`ModuleHandle`]
//! comes back. How a location becomes a module (process probing, metadata
//! parsing, caching) is entirely up to the manager implementation.

mod error;
mod memory;

use std::fmt;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

pub use error::RegistrationError;
pub use memory::InMemoryModuleManager;

/// Identifier assigned by a manager to a registered module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(NonZeroU32);

impl ModuleId {
    /// Create a module id. Returns `None` for zero.
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a registered module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleHandle {
    pub id: ModuleId,
    pub location: PathBuf,
}

impl ModuleHandle {
    pub fn new(id: ModuleId, location: impl Into<PathBuf>) -> Self {
        Self {
            id,
            location: location.into(),
        }
    }
}

/// External collaborator that turns executables into registered modules.
///
/// Implementations are called concurrently from the dispatcher's worker
/// pool and must be internally synchronized.
pub trait ModuleManager: Send + Sync {
    /// Manager name for logging.
    fn name(&self) -> &str {
        "modules"
    }

    /// Register the executable at `location`.
    ///
    /// Registering a location that already has a module replaces it.
    fn try_register(&self, location: &Path) -> Result<ModuleHandle, RegistrationError>;

    /// Unregister a previously returned handle. Unknown handles are ignored.
    fn unregister(&self, handle: &ModuleHandle);

    /// Find the module currently registered for `location`.
    ///
    /// The engine never calls this; it unregisters with the handle it got
    /// back from `try_register`, so a location re-registered behind its
    /// back is left alone.
    fn lookup(&self, location: &Path) -> Option<ModuleHandle>;
}
