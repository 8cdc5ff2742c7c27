//! Configuration module for the database monitor.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Server settings (port, bind address)
//! - Monitor settings (probe interval, timeout, invalidation time)
//! - Database targets (postgres, sqlite)

pub mod app;
pub mod targets;
pub mod validation;

pub use app::{AppConfig, MonitorConfig, ServerConfig};
pub use targets::DatabasesConfig;
pub use validation::ConfigError;
