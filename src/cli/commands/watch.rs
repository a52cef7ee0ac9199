//! Watch command - run the engine against real directories.

use std::sync::Arc;

use anyhow::{Context, bail};

use crate::config::Settings;
use crate::registry::InMemoryModuleManager;
use crate::watcher::{DirectoryWatcher, ReconcileReport, WatchServiceBuilder};

/// Options for the watch command, after CLI parsing.
#[derive(Debug, Default)]
pub struct WatchOptions {
    pub directories: Vec<String>,
    pub debug: bool,
    pub debounce_ms: Option<u64>,
    pub threads: Option<usize>,
    pub once: bool,
}

/// Run watch command.
pub fn run(settings: &Settings, options: WatchOptions) -> anyhow::Result<()> {
    let directories = if options.directories.is_empty() {
        settings.watcher.directories.clone()
    } else {
        options.directories
    };

    if directories.is_empty() {
        bail!("No directories given and watcher.directories is empty in the configuration");
    }

    let manager = Arc::new(InMemoryModuleManager::new());
    let mut builder = WatchServiceBuilder::from_settings(settings)
        .manager(manager.clone())
        .debug(settings.debug || options.debug);
    if let Some(ms) = options.debounce_ms {
        builder = builder.debounce_ms(ms);
    }
    if let Some(threads) = options.threads {
        builder = builder.parallel_threads(threads);
    }

    let service = builder.build().context("Failed to start watcher")?;
    let report = service.watcher().set_directories(&directories);

    print_report(&report);
    print_state(service.watcher(), &manager);

    if options.once {
        service.shutdown();
        return Ok(());
    }

    println!("Watching for changes (Ctrl+C to stop)");
    loop {
        std::thread::park();
    }
}

fn print_report(report: &ReconcileReport) {
    println!(
        "Loaded {}, failed {}, unloaded {}",
        report.loaded.len(),
        report.failed.len(),
        report.unloaded.len()
    );
    for path in &report.failed {
        println!("  failed: {}", path.display());
    }
}

fn print_state(watcher: &DirectoryWatcher, manager: &InMemoryModuleManager) {
    let directories = watcher.directories();
    if directories.is_empty() {
        println!("No valid directories to watch");
        return;
    }

    println!("Watched directories:");
    for dir in &directories {
        println!("  {}", dir.display());
    }

    println!("Registered modules:");
    for handle in manager.modules() {
        println!("  {} {}", handle.id, handle.location.display());
    }
}
