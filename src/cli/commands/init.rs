//! Init and Config commands.

use anyhow::anyhow;

use crate::config::Settings;

/// Run init command - create configuration file.
pub fn run_init(force: bool) -> anyhow::Result<()> {
    let path = Settings::init_config_file(force).map_err(|e| anyhow!("{e}"))?;
    println!("Created configuration file at: {}", path.display());
    println!("Add directories under [watcher] to watch them by default.");
    Ok(())
}

/// Run config command - display current configuration.
pub fn run_config(config: &Settings) -> anyhow::Result<()> {
    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
