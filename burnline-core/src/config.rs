//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/burnline/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/burnline/` (~/.config/burnline/)
//! - Data: `$XDG_DATA_HOME/burnline/` (~/.local/share/burnline/)
//! - State/Logs: `$XDG_STATE_HOME/burnline/` (~/.local/state/burnline/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

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
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Analytics configuration
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Database location override
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Analytics engine configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AnalyticsConfig {
    /// Time budget for one orchestrated analytics request, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Length of the trailing window used for objective progress charts
    #[serde(default = "default_objective_window_days")]
    pub objective_window_days: u32,

    /// Sprint health thresholds
    #[serde(default)]
    pub health: HealthThresholds,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            objective_window_days: default_objective_window_days(),
            health: HealthThresholds::default(),
        }
    }
}

impl AnalyticsConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(Error::Config(
                "analytics.timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.objective_window_days == 0 {
            return Err(Error::Config(
                "analytics.objective_window_days must be greater than 0".to_string(),
            ));
        }
        self.health.validate()
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_objective_window_days() -> u32 {
    30
}

/// How far work progress may trail time progress before a sprint is flagged.
///
/// Margins are fractions of the sprint (0.2 = 20 percentage points).
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct HealthThresholds {
    /// Trailing by more than this marks the sprint `behind`
    #[serde(default = "default_behind_margin")]
    pub behind_margin: f64,

    /// Trailing by more than this marks the sprint `at_risk`
    #[serde(default = "default_at_risk_margin")]
    pub at_risk_margin: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            behind_margin: default_behind_margin(),
            at_risk_margin: default_at_risk_margin(),
        }
    }
}

impl HealthThresholds {
    pub fn validate(&self) -> Result<()> {
        let ordered = 0.0 <= self.at_risk_margin
            && self.at_risk_margin <= self.behind_margin
            && self.behind_margin <= 1.0;
        if !ordered {
            return Err(Error::Config(format!(
                "analytics.health margins must satisfy 0 <= at_risk_margin ({}) <= behind_margin ({}) <= 1",
                self.at_risk_margin, self.behind_margin
            )));
        }
        Ok(())
    }
}

fn default_behind_margin() -> f64 {
    0.2
}

fn default_at_risk_margin() -> f64 {
    0.1
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

/// Database configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct DatabaseConfig {
    /// Override for the SQLite database file
    pub path: Option<PathBuf>,
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
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.analytics.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/burnline/config.toml` (~/.config/burnline/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("burnline").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/burnline/` (~/.local/share/burnline/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("burnline")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/burnline/` (~/.local/state/burnline/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("burnline")
    }

    /// Returns the default database file path
    ///
    /// `$XDG_DATA_HOME/burnline/burnline.db`
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("burnline.db")
    }

    /// Database path honoring the `[database] path` override.
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(Self::database_path)
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/burnline/burnline.log`
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("burnline.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.analytics.timeout_ms, 30_000);
        assert_eq!(config.analytics.objective_window_days, 30);
        assert_eq!(config.analytics.health.behind_margin, 0.2);
        assert_eq!(config.analytics.health.at_risk_margin, 0.1);
        assert_eq!(config.logging.level, "info");
        assert!(config.database.path.is_none());
        assert!(config.analytics.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[analytics]
timeout_ms = 5000
objective_window_days = 14

[analytics.health]
behind_margin = 0.3

[logging]
level = "debug"

[database]
path = "/tmp/burnline-test.db"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.analytics.timeout_ms, 5000);
        assert_eq!(config.analytics.objective_window_days, 14);
        assert_eq!(config.analytics.health.behind_margin, 0.3);
        // Unset margin keeps its default
        assert_eq!(config.analytics.health.at_risk_margin, 0.1);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.resolved_database_path(),
            PathBuf::from("/tmp/burnline-test.db")
        );
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = AnalyticsConfig {
            objective_window_days: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AnalyticsConfig {
            health: HealthThresholds {
                behind_margin: 0.1,
                at_risk_margin: 0.2,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AnalyticsConfig {
            timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[analytics]\nobjective_window_days = 7").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.analytics.objective_window_days, 7);
    }

    #[test]
    fn test_load_from_rejects_invalid_margins() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[analytics.health]\nbehind_margin = 1.5").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_paths_are_namespaced() {
        assert!(Config::config_path().ends_with("burnline/config.toml"));
        assert!(Config::database_path().ends_with("burnline/burnline.db"));
        assert!(Config::log_path().ends_with("burnline/burnline.log"));
    }
}
