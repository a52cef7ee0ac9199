//! Coalescing of bursty change notifications.
//!
//! Copying a batch of executables into a watched directory produces one
//! notification per file. Debouncing collapses them into a single
//! reconciliation pass once the directory has been quiet for a while.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::event::WatchEvent;

/// Debounces watch events by identity.
///
/// Records event timestamps and returns events that have been stable
/// for the configured duration.
#[derive(Debug)]
pub struct Debouncer {
    /// Pending events: event -> last occurrence.
    pending: HashMap<WatchEvent, Instant>,
    /// How long an event must be quiet before processing.
    duration: Duration,
}

impl Debouncer {
    /// Create a new debouncer with the given duration in milliseconds.
    ///
    /// A zero duration makes every recorded event ready immediately.
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            pending: HashMap::new(),
            duration: Duration::from_millis(debounce_ms),
        }
    }

    /// Record an event occurrence.
    ///
    /// Resets the debounce timer for this event.
    pub fn record(&mut self, event: WatchEvent) {
        self.pending.insert(event, Instant::now());
    }

    /// Take all events that have been quiet for the debounce duration.
    ///
    /// Directory events come before file events so that a file removed in
    /// the same burst is unloaded before a reload is attempted.
    pub fn take_ready(&mut self) -> Vec<WatchEvent> {
        let now = Instant::now();
        let mut ready = Vec::new();

        self.pending.retain(|event, last_seen| {
            if now.duration_since(*last_seen) >= self.duration {
                ready.push(event.clone());
                false
            } else {
                true
            }
        });

        ready.sort_by_key(|event| match event {
            WatchEvent::DirectoryChanged(_) => 0,
            WatchEvent::FileChanged(_) => 1,
        });
        ready
    }

    /// Check if there are any pending events.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Get the number of pending events.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
