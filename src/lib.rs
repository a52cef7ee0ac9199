//! Keeps a registry of executable modules in sync with a set of watched
//! directories.
//!
//! The [`DirectoryWatcher`] diffs the desired directory list against what
//! it already tracks, registers and unregisters modules concurrently
//! through a [`ModuleManager`], and re-runs targeted passes when the
//! filesystem reports changes.

pub mod cli;
pub mod config;
pub mod logging;
pub mod registry;
pub mod watcher;

pub use config::Settings;
pub use registry::{
    InMemoryModuleManager, ModuleHandle, ModuleId, ModuleManager, RegistrationError,
};
pub use watcher::{
    DirectoryWatcher, Dispatcher, ReconcileReport, WatchError, WatchEvent, WatchService,
    WatchServiceBuilder, WatchSubscription,
};
