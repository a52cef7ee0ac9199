//! Directory watcher that keeps registered modules in sync with the disk.
//!
//! # Architecture
//!
//! ```text
//! set_directories(list)        notify events
//!        |                           |
//!   path_filter                 EventLoop (route + debounce)
//!        |                           |
//!        +-----> DirectoryWatcher <--+
//!                 (one pass at a time)
//!                        |
//!                   reconciler  --- scanner
//!                        |
//!                   Dispatcher (rayon fan-out, barrier)
//!                        |
//!                   WatchState --> WatchSubscription
//! ```

mod debouncer;
mod dispatcher;
mod engine;
mod error;
mod event;
pub mod path_filter;
mod reconciler;
pub mod scanner;
mod service;
mod state;
mod subscription;

pub use debouncer::Debouncer;
pub use dispatcher::Dispatcher;
pub use engine::DirectoryWatcher;
pub use error::WatchError;
pub use event::{WatchEvent, route};
pub use reconciler::{ReconcilePlan, ReconcileReport, plan_directory, plan_full};
pub use service::{EventLoop, WatchService, WatchServiceBuilder};
pub use state::WatchState;
pub use subscription::{NotifySubscription, WatchSubscription};
