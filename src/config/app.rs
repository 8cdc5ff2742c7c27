//! Application configuration structures.

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::targets::DatabasesConfig;
use super::validation::{ConfigError, expand_env_vars};

// =============================================================================
// Constants
// =============================================================================

/// Default probe interval (5 seconds).
pub const DEFAULT_TEST_INTERVAL: Duration = Duration::from_secs(5);

/// Default per-operation probe timeout (5 seconds).
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Default result invalidation time (5 seconds).
pub const DEFAULT_INVALIDATION_TIME: Duration = Duration::from_secs(5);

/// Default result channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Minimum probe interval (1 second).
pub const MIN_TEST_INTERVAL: Duration = Duration::from_secs(1);

fn default_test_interval() -> Duration {
    DEFAULT_TEST_INTERVAL
}

fn default_test_timeout() -> Duration {
    DEFAULT_TEST_TIMEOUT
}

fn default_invalidation_time() -> Duration {
    DEFAULT_INVALIDATION_TIME
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Web server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address (default: "0.0.0.0").
    pub bind: String,

    /// Server port (default: 8080).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

// =============================================================================
// Monitor Configuration
// =============================================================================

/// Probe scheduling and caching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Interval between probe rounds (default: "5s").
    #[serde(default = "default_test_interval", with = "humantime_serde")]
    pub test_interval: Duration,

    /// Timeout for each read/write probe operation (default: "5s").
    #[serde(default = "default_test_timeout", with = "humantime_serde")]
    pub test_timeout: Duration,

    /// How long a cached result stays valid (default: "5s").
    #[serde(default = "default_invalidation_time", with = "humantime_serde")]
    pub invalidation_time: Duration,

    /// Result channel capacity (default: 256).
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            test_interval: DEFAULT_TEST_INTERVAL,
            test_timeout: DEFAULT_TEST_TIMEOUT,
            invalidation_time: DEFAULT_INVALIDATION_TIME,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Web server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Probe scheduling configuration.
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Database target configurations grouped by backend.
    #[serde(default)]
    pub databases: DatabasesConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// Environment variable references (`${VAR}`, `${VAR:-default}`) in the
    /// file are expanded before parsing.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let expanded = expand_env_vars(&content);
        let config: Self = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate server bind address
        self.server.bind.parse::<IpAddr>().map_err(|_| {
            ConfigError::ValidationError(format!(
                "invalid server bind address: '{}'",
                self.server.bind
            ))
        })?;

        // Validate server port
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server port must be non-zero".to_string(),
            ));
        }

        // Validate probe interval
        if self.monitor.test_interval < MIN_TEST_INTERVAL {
            return Err(ConfigError::ValidationError(format!(
                "monitor test_interval must be at least {:?}",
                MIN_TEST_INTERVAL
            )));
        }

        // Validate probe timeout
        if self.monitor.test_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "monitor test_timeout must be positive".to_string(),
            ));
        }

        // Validate invalidation time
        if self.monitor.invalidation_time.is_zero() {
            return Err(ConfigError::ValidationError(
                "monitor invalidation_time must be positive".to_string(),
            ));
        }

        // Validate channel capacity
        if self.monitor.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "monitor channel_capacity must be positive".to_string(),
            ));
        }

        // Validate database targets
        self.databases.validate()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::postgres::PostgresConfig;
    use std::io::Write;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_monitor_config_default() {
        let config = MonitorConfig::default();
        assert_eq!(config.test_interval, DEFAULT_TEST_INTERVAL);
        assert_eq!(config.test_timeout, DEFAULT_TEST_TIMEOUT);
        assert_eq!(config.invalidation_time, DEFAULT_INVALIDATION_TIME);
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_config_validation_valid() {
        let config = AppConfig {
            server: ServerConfig {
                bind: "127.0.0.1".to_string(),
                port: 8080,
            },
            monitor: MonitorConfig::default(),
            databases: DatabasesConfig {
                postgres: vec![PostgresConfig::new("localhost", 5432, "app")],
                sqlite: vec![],
            },
        };

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_port() {
        let config = AppConfig {
            server: ServerConfig {
                bind: "0.0.0.0".to_string(),
                port: 0,
            },
            monitor: MonitorConfig::default(),
            databases: DatabasesConfig::default(),
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_bind_address() {
        let config = AppConfig {
            server: ServerConfig {
                bind: "not-an-ip".to_string(),
                port: 8080,
            },
            monitor: MonitorConfig::default(),
            databases: DatabasesConfig::default(),
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("invalid server bind address")
        );
    }

    #[test]
    fn test_config_validation_interval_too_short() {
        let config = AppConfig {
            server: ServerConfig::default(),
            monitor: MonitorConfig {
                test_interval: Duration::from_millis(100),
                ..MonitorConfig::default()
            },
            databases: DatabasesConfig::default(),
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("test_interval"));
    }

    #[test]
    fn test_load_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
server:
  bind: "127.0.0.1"
  port: 9090
monitor:
  test_interval: 10s
  invalidation_time: 30s
databases:
  sqlite:
    - file_path: /tmp/probe.db
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.monitor.test_interval, Duration::from_secs(10));
        assert_eq!(config.monitor.invalidation_time, Duration::from_secs(30));
        // Unspecified fields fall back to defaults
        assert_eq!(config.monitor.test_timeout, DEFAULT_TEST_TIMEOUT);
        assert_eq!(config.databases.len(), 1);
    }

    #[test]
    fn test_load_expands_env_vars() {
        // SAFETY: test-specific variable, removed before the test returns.
        unsafe {
            std::env::set_var("DBMON_TEST_BIND", "127.0.0.1");
        }

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
server:
  bind: "${{DBMON_TEST_BIND}}"
  port: ${{DBMON_TEST_APP_PORT:-8081}}
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.server.port, 8081);

        // SAFETY: cleanup test variable.
        unsafe {
            std::env::remove_var("DBMON_TEST_BIND");
        }
    }
}
