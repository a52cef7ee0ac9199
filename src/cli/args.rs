//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Executable module watcher
#[derive(Parser, Debug)]
#[command(
    name = "modwatch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Keep executable modules registered as watched directories change",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize configuration
    #[command(about = "Set up .modwatch directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration
    #[command(about = "Display active settings")]
    Config,

    /// List executables that would be registered
    #[command(about = "List executables found directly inside directories")]
    Scan {
        /// Directories to scan
        #[arg(value_name = "DIR", required = true)]
        directories: Vec<String>,
    },

    /// Watch directories and keep modules registered
    #[command(about = "Watch directories and register their executables")]
    Watch {
        /// Directories to watch (defaults to watcher.directories from config)
        #[arg(value_name = "DIR")]
        directories: Vec<String>,

        /// Report registration failures and reloads
        #[arg(short, long)]
        debug: bool,

        /// Quiet period before reconciling a burst of changes (overrides config)
        #[arg(long, value_name = "MS")]
        debounce_ms: Option<u64>,

        /// Number of dispatch threads (overrides config)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Exit after the initial pass instead of watching
        #[arg(long)]
        once: bool,
    },
}
