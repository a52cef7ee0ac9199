//! Configuration module for the module watcher.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides (applied by the caller)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `MODWATCH_` and use double
//! underscores to separate nested levels:
//! - `MODWATCH_DEBUG=true` sets `debug`
//! - `MODWATCH_WATCHER__DEBOUNCE_MS=500` sets `watcher.debounce_ms`
//! - `MODWATCH_DISPATCH__PARALLEL_THREADS=8` sets `dispatch.parallel_threads`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Directory holding the settings file, searched for from the current directory upwards.
pub const CONFIG_DIR: &str = ".modwatch";
pub const CONFIG_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "MODWATCH_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Report registration failures and reload outcomes
    #[serde(default)]
    pub debug: bool,

    /// Watched directories and notification handling
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Concurrent load/unload dispatch
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Log filtering
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatcherConfig {
    /// Directories to watch for executables
    #[serde(default)]
    pub directories: Vec<String>,

    /// Quiet period before a burst of notifications is reconciled
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DispatchConfig {
    /// Worker threads used for registration batches
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level for all targets
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides, e.g. `modwatch::watcher = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_debounce_ms() -> u64 {
    250
}
fn default_parallel_threads() -> usize {
    num_cpus::get()
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            debug: false,
            watcher: WatcherConfig::default(),
            dispatch: DispatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            parallel_threads: default_parallel_threads(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref()).extract().map_err(Box::new)
    }

    fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            // Double underscore separates nested levels; single underscores stay in field names
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Find the settings file by looking for a `.modwatch` directory
    /// from the current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|ancestor| ancestor.join(CONFIG_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join(CONFIG_FILE))
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file under the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join(CONFIG_FILE);
        Self::init_config_file_at(&config_path, force)?;
        Ok(config_path)
    }

    /// Create a default settings file at `path`
    pub fn init_config_file_at(
        path: &Path,
        force: bool,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if !force && path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(path)
    }
}
