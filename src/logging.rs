//! Tracing subscriber setup and the `[component] event: detail` macros.
//!
//! Levels come from `[logging]` in settings unless `RUST_LOG` is set, in
//! which case it wins. Output goes to stderr; stdout is for command output.

use std::sync::Once;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// Compact time format: HH:MM:SS.mmm
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Install the global subscriber. Only the first call has any effect.
pub fn init_with_config(config: &LoggingConfig) {
    INIT.call_once(|| {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_timer(CompactTime)
            .with_writer(std::io::stderr)
            .with_filter(env_filter(config));

        tracing_subscriber::registry().with(fmt_layer).init();
    });
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    match std::env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => EnvFilter::new(filter_directives(config)),
    }
}

/// `EnvFilter` directives for `config`, module overrides sorted by name.
pub fn filter_directives(config: &LoggingConfig) -> String {
    let mut modules: Vec<_> = config.modules.iter().collect();
    modules.sort();

    modules
        .into_iter()
        .fold(config.default.clone(), |mut directives, (module, level)| {
            directives.push_str(&format!(",{module}={level}"));
            directives
        })
}

/// Info-level `[component] event` line, with optional formatted detail.
#[macro_export]
macro_rules! log_event {
    ($component:expr, $event:expr) => {
        tracing::info!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::info!("[{}] {}: {}", $component, $event, format_args!($($arg)*))
    };
}

/// Debug-level counterpart of [`log_event!`].
#[macro_export]
macro_rules! debug_event {
    ($component:expr, $event:expr) => {
        tracing::debug!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::debug!("[{}] {}: {}", $component, $event, format_args!($($arg)*))
    };
}
