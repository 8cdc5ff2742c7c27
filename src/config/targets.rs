//! Database target configuration structures.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::database::postgres::PostgresConfig;
use crate::database::sqlite::SqliteConfig;

use super::validation::ConfigError;

/// Database target configurations grouped by backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabasesConfig {
    /// PostgreSQL targets.
    #[serde(default)]
    pub postgres: Vec<PostgresConfig>,

    /// SQLite targets.
    #[serde(default)]
    pub sqlite: Vec<SqliteConfig>,
}

impl DatabasesConfig {
    /// Total number of configured targets.
    pub fn len(&self) -> usize {
        self.postgres.len() + self.sqlite.len()
    }

    /// Whether no targets are configured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate all target configurations.
    ///
    /// Identifiers double as cache keys, so duplicates are rejected across
    /// both backend kinds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen_identifiers = HashSet::new();

        for pg in &self.postgres {
            if pg.host.is_empty() {
                return Err(ConfigError::ValidationError(
                    "postgres target host cannot be empty".to_string(),
                ));
            }
            if pg.database.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "postgres target '{}': database name cannot be empty",
                    pg.host
                )));
            }
            let identifier = pg.identifier();
            if !seen_identifiers.insert(identifier.clone()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate database target: '{}'",
                    identifier
                )));
            }
        }

        for sq in &self.sqlite {
            if sq.file_path.is_empty() {
                return Err(ConfigError::ValidationError(
                    "sqlite target file_path cannot be empty".to_string(),
                ));
            }
            let identifier = sq.identifier();
            if !seen_identifiers.insert(identifier.clone()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate database target: '{}'",
                    identifier
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_databases_config_validate_ok() {
        let config = DatabasesConfig {
            postgres: vec![PostgresConfig::new("localhost", 5432, "app")],
            sqlite: vec![SqliteConfig::new("/tmp/app.db")],
        };

        assert!(config.validate().is_ok());
        assert_eq!(config.len(), 2);
    }

    #[test]
    fn test_databases_config_validate_duplicate_identifiers() {
        let config = DatabasesConfig {
            postgres: vec![
                PostgresConfig::new("localhost", 5432, "app"),
                PostgresConfig::new("localhost", 5432, "app"),
            ],
            sqlite: vec![],
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("duplicate"));
    }

    #[test]
    fn test_databases_config_validate_empty_host() {
        let config = DatabasesConfig {
            postgres: vec![PostgresConfig::new("", 5432, "app")],
            sqlite: vec![],
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_databases_config_validate_empty_file_path() {
        let config = DatabasesConfig {
            postgres: vec![],
            sqlite: vec![SqliteConfig::new("")],
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("file_path"));
    }

    #[test]
    fn test_databases_config_serde_defaults() {
        let config: DatabasesConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.is_empty());
    }
}
