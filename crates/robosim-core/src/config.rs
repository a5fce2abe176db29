//! Configuration loading and typed config structures for Robosim.
//!
//! The canonical configuration lives in `robosim-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and validates the file.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level Robosim configuration.
///
/// Mirrors the structure of `robosim-config.yaml`. All fields have
/// defaults, so a missing or empty file yields a runnable configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RobosimConfig {
    /// Observer HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Simulation timing and pathfinding settings.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Factory persistence settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Snapshot replication settings.
    #[serde(default)]
    pub replication: ReplicationConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RobosimConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for deployment settings:
    /// - `NATS_URL` overrides `replication.nats_url`
    /// - `ROBOSIM_DATA_DIR` overrides `storage.data_dir`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.replication.apply_env_overrides();
        config.storage.apply_env_overrides();
        Ok(config)
    }
}

/// Observer HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Address the observer server binds to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the observer server listens on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    /// The `host:port` string to bind a listener to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Simulation timing and pathfinding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Real-time milliseconds each robot sleeps between behavior ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Cell size of the pathfinding grid in factory units.
    #[serde(default = "default_grid_resolution")]
    pub grid_resolution: i32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            grid_resolution: default_grid_resolution(),
        }
    }
}

/// Factory persistence configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Directory where `.factory` files are stored.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl StorageConfig {
    /// Override the data directory with `ROBOSIM_DATA_DIR` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ROBOSIM_DATA_DIR") {
            self.data_dir = val;
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Snapshot replication configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReplicationConfig {
    /// Whether snapshots are forwarded to NATS at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// NATS messaging URL.
    #[serde(default = "default_nats_url")]
    pub nats_url: String,
}

impl ReplicationConfig {
    /// Override the NATS URL with `NATS_URL` when set.
    ///
    /// This allows Docker Compose (or any deployment) to set the connection
    /// string via env vars without modifying the YAML config file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("NATS_URL") {
            self.nats_url = val;
        }
    }
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            nats_url: default_nats_url(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
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

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8080
}

const fn default_tick_interval_ms() -> u64 {
    100
}

const fn default_grid_resolution() -> i32 {
    5
}

fn default_data_dir() -> String {
    "data".to_owned()
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = RobosimConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.simulation.tick_interval_ms, 100);
        assert_eq!(config.simulation.grid_resolution, 5);
        assert!(config.replication.enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 9090

simulation:
  tick_interval_ms: 50
  grid_resolution: 10

storage:
  data_dir: "/var/lib/robosim"

replication:
  enabled: false
  nats_url: "nats://testhost:4222"

logging:
  level: "debug"
"#;

        let config = RobosimConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.bind_addr(), "127.0.0.1:9090");
        assert_eq!(config.simulation.tick_interval_ms, 50);
        assert_eq!(config.simulation.grid_resolution, 10);
        assert!(!config.replication.enabled);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn parse_minimal_yaml() {
        let yaml = "simulation:\n  tick_interval_ms: 20\n";
        let config = RobosimConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        // Interval is overridden
        assert_eq!(config.simulation.tick_interval_ms, 20);
        // Everything else uses defaults
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.simulation.grid_resolution, 5);
    }

    #[test]
    fn parse_empty_yaml() {
        let yaml = "";
        let config = RobosimConfig::parse(yaml);
        assert!(config.is_ok());
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("robosim-config.yaml");
        if path.exists() {
            let config = RobosimConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
