//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/guildstats/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/guildstats/` (~/.config/guildstats/)
//! - Data: `$XDG_DATA_HOME/guildstats/` (~/.local/share/guildstats/)
//! - State/Logs: `$XDG_STATE_HOME/guildstats/` (~/.local/state/guildstats/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Database location override
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Snapshot computation options
    #[serde(default)]
    pub snapshot: SnapshotConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Deserialize, Default)]
pub struct DatabaseConfig {
    /// Path to the metrics database; defaults to the XDG data directory
    pub path: Option<PathBuf>,
}

/// Snapshot computation configuration
#[derive(Debug, Deserialize, Default)]
pub struct SnapshotConfig {
    /// Enable the per-command invocation breakdown calculator
    #[serde(default)]
    pub command_activity: bool,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/guildstats/config.toml`
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("guildstats").join("config.toml")
    }

    /// Returns the data directory path (for the SQLite database)
    ///
    /// `$XDG_DATA_HOME/guildstats/`
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("guildstats")
    }

    /// Returns the default database path
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("metrics.db")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/guildstats/`
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("guildstats")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("guildstats.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.database.path.is_none());
        assert!(!config.snapshot.command_activity);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str(
            r#"
            [snapshot]
            command_activity = true

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert!(config.snapshot.command_activity);
        assert_eq!(config.logging.level, "debug");
        assert!(config.database.path.is_none());
    }

    #[test]
    fn test_database_path_ends_with_db_file() {
        assert!(Config::database_path().ends_with("guildstats/metrics.db"));
    }
}
