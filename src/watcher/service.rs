//! Background event loop feeding notifications into the engine.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, select, unbounded};
use notify::Event;

use crate::config::Settings;
use crate::registry::ModuleManager;

use super::debouncer::Debouncer;
use super::dispatcher::Dispatcher;
use super::engine::DirectoryWatcher;
use super::error::WatchError;
use super::subscription::NotifySubscription;

/// How often pending debounced events are checked.
const TICK: Duration = Duration::from_millis(50);

/// Receives raw notifications, routes and debounces them, and runs the
/// resulting reconciliation passes one at a time.
pub struct EventLoop {
    watcher: Arc<DirectoryWatcher>,
    event_rx: Receiver<notify::Result<Event>>,
    stop_rx: Receiver<()>,
    debouncer: Debouncer,
}

impl EventLoop {
    pub fn new(
        watcher: Arc<DirectoryWatcher>,
        event_rx: Receiver<notify::Result<Event>>,
        stop_rx: Receiver<()>,
        debounce_ms: u64,
    ) -> Self {
        Self {
            watcher,
            event_rx,
            stop_rx,
            debouncer: Debouncer::new(debounce_ms),
        }
    }

    /// Run until the stop channel fires or disconnects.
    ///
    /// Returns `ChannelClosed` if the notification source goes away first.
    pub fn run(mut self) -> Result<(), WatchError> {
        crate::debug_event!("watcher", "event loop started");

        loop {
            select! {
                recv(self.event_rx) -> msg => match msg {
                    Ok(Ok(event)) => {
                        for routed in self.watcher.route(&event) {
                            self.debouncer.record(routed);
                        }
                    }
                    Ok(Err(e)) => {
                        tracing::error!("[watcher] file watch error: {e}");
                    }
                    Err(_) => return Err(WatchError::ChannelClosed),
                },
                recv(self.stop_rx) -> _stop => break,
                default(TICK) => {}
            }

            for event in self.debouncer.take_ready() {
                crate::debug_event!("watcher", "processing", "{event}");
                if self.watcher.handle_routed_event(event.clone()).is_none() {
                    crate::debug_event!("watcher", "skipped", "{}", event.path().display());
                }
            }
        }

        if self.debouncer.has_pending() {
            crate::debug_event!(
                "watcher",
                "dropping pending",
                "{}",
                self.debouncer.pending_count()
            );
        }
        crate::debug_event!("watcher", "event loop stopped");
        Ok(())
    }
}

/// A running engine plus its event thread.
///
/// Dropping the service stops the thread and tears the engine down.
pub struct WatchService {
    watcher: Arc<DirectoryWatcher>,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl WatchService {
    /// Create a builder for configuring the service.
    pub fn builder() -> WatchServiceBuilder {
        WatchServiceBuilder::new()
    }

    /// Start an event loop for `watcher` reading raw events from `event_rx`.
    pub fn spawn(
        watcher: Arc<DirectoryWatcher>,
        event_rx: Receiver<notify::Result<Event>>,
        debounce_ms: u64,
    ) -> Result<Self, WatchError> {
        let (stop_tx, stop_rx) = unbounded();
        let event_loop = EventLoop::new(Arc::clone(&watcher), event_rx, stop_rx, debounce_ms);

        let handle = thread::Builder::new()
            .name("modwatch-events".to_string())
            .spawn(move || {
                if let Err(e) = event_loop.run() {
                    tracing::error!("[watcher] event loop stopped: {e}");
                }
            })
            .map_err(|e| WatchError::InitFailed {
                reason: format!("Failed to spawn event thread: {e}"),
            })?;

        Ok(Self {
            watcher,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// The engine behind this service.
    pub fn watcher(&self) -> &Arc<DirectoryWatcher> {
        &self.watcher
    }

    /// Stop the event thread and tear the engine down.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        // Disconnecting the stop channel wakes the loop
        drop(self.stop_tx.take());

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("[watcher] event thread panicked");
            }
            self.watcher.teardown();
            crate::log_event!("watcher", "stopped");
        }
    }
}

impl Drop for WatchService {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Builder for constructing a WatchService.
pub struct WatchServiceBuilder {
    manager: Option<Arc<dyn ModuleManager>>,
    debug: bool,
    debounce_ms: u64,
    parallel_threads: usize,
}

impl WatchServiceBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            manager: None,
            debug: false,
            debounce_ms: 250,
            parallel_threads: num_cpus::get(),
        }
    }

    /// Take debug, debounce and thread settings from configuration.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new()
            .debug(settings.debug)
            .debounce_ms(settings.watcher.debounce_ms)
            .parallel_threads(settings.dispatch.parallel_threads)
    }

    /// Set the module manager.
    pub fn manager(mut self, manager: Arc<dyn ModuleManager>) -> Self {
        self.manager = Some(manager);
        self
    }

    /// Enable verbose failure reporting.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the debounce duration in milliseconds.
    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Set the dispatch pool size.
    pub fn parallel_threads(mut self, threads: usize) -> Self {
        self.parallel_threads = threads;
        self
    }

    /// Build the engine, subscribe to notifications and start the event thread.
    pub fn build(self) -> Result<WatchService, WatchError> {
        let manager = self.manager.ok_or_else(|| WatchError::InitFailed {
            reason: "Module manager is required".to_string(),
        })?;

        let (tx, rx) = unbounded();
        let subscription = NotifySubscription::new(tx)?;
        let dispatcher = Dispatcher::new(manager, self.parallel_threads)?;

        let watcher = Arc::new(DirectoryWatcher::new(dispatcher, Box::new(subscription)));
        watcher.set_debug(self.debug);

        crate::debug_event!(
            "watcher",
            "service configured",
            "debounce {}ms, {} threads",
            self.debounce_ms,
            self.parallel_threads
        );

        WatchService::spawn(watcher, rx, self.debounce_ms)
    }
}

impl Default for WatchServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
