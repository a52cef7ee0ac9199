use clap::Parser;

use modwatch::Settings;
use modwatch::cli::commands::{init, scan, watch};
use modwatch::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .map_err(|e| anyhow::anyhow!("Error loading configuration: {e}"))?;

    if let Commands::Watch { debug: true, .. } = &cli.command {
        settings.debug = true;
        if settings.logging.default == "warn" {
            settings.logging.default = "info".to_string();
        }
    }

    modwatch::logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Init { force } => init::run_init(force),
        Commands::Config => init::run_config(&settings),
        Commands::Scan { directories } => scan::run(&directories),
        Commands::Watch {
            directories,
            debug,
            debounce_ms,
            threads,
            once,
        } => watch::run(
            &settings,
            watch::WatchOptions {
                directories,
                debug,
                debounce_ms,
                threads,
                once,
            },
        ),
    }
}
