//! PostgreSQL probe target.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use tokio::sync::Mutex;

use super::traits::{Database, DatabaseError};

/// Default PostgreSQL port.
const DEFAULT_PORT: u16 = 5432;

/// Default connection timeout (5 seconds).
const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_connection_timeout() -> Duration {
    DEFAULT_CONNECTION_TIMEOUT
}

/// Configuration for a PostgreSQL probe target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Target host.
    pub host: String,
    /// Target port (default: 5432).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Login user.
    #[serde(default)]
    pub username: String,
    /// Login password.
    #[serde(default)]
    pub password: String,
    /// Database name.
    pub database: String,
    /// Require TLS with full certificate verification (default: false).
    #[serde(default)]
    pub use_ssl: bool,
    /// Client certificate path.
    #[serde(default)]
    pub ssl_cert_path: Option<String>,
    /// Client key path.
    #[serde(default)]
    pub ssl_key_path: Option<String>,
    /// Root certificate path for server verification.
    #[serde(default)]
    pub ssl_root_cert_path: Option<String>,
    /// Connection timeout (default: 5s).
    #[serde(default = "default_connection_timeout", with = "humantime_serde")]
    pub connection_timeout: Duration,
}

impl PostgresConfig {
    /// Create a new PostgreSQL target configuration.
    pub fn new(host: impl Into<String>, port: u16, database: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            username: String::new(),
            password: String::new(),
            database: database.into(),
            use_ssl: false,
            ssl_cert_path: None,
            ssl_key_path: None,
            ssl_root_cert_path: None,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
        }
    }

    /// Unique identifier for this target: `host:port/database`.
    pub fn identifier(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }

    /// Set login credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Enable TLS with full certificate verification.
    pub fn with_ssl(mut self, use_ssl: bool) -> Self {
        self.use_ssl = use_ssl;
        self
    }

    /// Set the connection timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

/// PostgreSQL probe target.
///
/// Holds a single-connection pool behind a mutex; `connect` and `close`
/// replace it as a unit so probe steps never observe a half-open state.
pub struct PostgresDatabase {
    config: PostgresConfig,
    identifier: String,
    pool: Mutex<Option<PgPool>>,
}

impl PostgresDatabase {
    /// Create a new PostgreSQL target from its configuration.
    pub fn new(config: PostgresConfig) -> Self {
        let identifier = config.identifier();
        Self {
            config,
            identifier,
            pool: Mutex::new(None),
        }
    }

    fn connect_options(&self) -> PgConnectOptions {
        let mut options = PgConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .database(&self.config.database);

        if !self.config.username.is_empty() {
            options = options.username(&self.config.username);
        }
        if !self.config.password.is_empty() {
            options = options.password(&self.config.password);
        }

        if self.config.use_ssl {
            options = options.ssl_mode(PgSslMode::VerifyFull);
            if let Some(ref cert) = self.config.ssl_cert_path {
                options = options.ssl_client_cert(cert);
            }
            if let Some(ref key) = self.config.ssl_key_path {
                options = options.ssl_client_key(key);
            }
            if let Some(ref root) = self.config.ssl_root_cert_path {
                options = options.ssl_root_cert(root);
            }
        } else {
            options = options.ssl_mode(PgSslMode::Disable);
        }

        options
    }

    async fn pool(&self) -> Result<PgPool, DatabaseError> {
        (*self.pool.lock().await)
            .clone()
            .ok_or(DatabaseError::NotConnected)
    }

    async fn create_test_table(&self) -> Result<(), DatabaseError> {
        let pool = self.pool().await?;
        tracing::debug!(database = %self.identifier, "dropping test table");
        sqlx::query("DROP TABLE IF EXISTS test").execute(&pool).await?;
        tracing::debug!(database = %self.identifier, "creating test table");
        sqlx::query("CREATE TABLE test (test varchar(255))")
            .execute(&pool)
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for PostgresDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresDatabase")
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Database for PostgresDatabase {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn connect(&self) -> Result<(), DatabaseError> {
        tracing::debug!(database = %self.identifier, "connecting to postgres");
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.config.connection_timeout)
            .connect_with(self.connect_options())
            .await?;
        *self.pool.lock().await = Some(pool);
        tracing::debug!(database = %self.identifier, "connected to postgres");
        Ok(())
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        let pool = self.pool.lock().await.take();
        if let Some(pool) = pool {
            tracing::debug!(database = %self.identifier, "closing postgres connection");
            pool.close().await;
        }
        Ok(())
    }

    async fn test_read(&self) -> Result<(), DatabaseError> {
        let pool = self.pool().await?;
        tracing::debug!(database = %self.identifier, "reading test data");
        sqlx::query("SELECT * FROM test").fetch_all(&pool).await?;
        Ok(())
    }

    async fn test_write(&self) -> Result<(), DatabaseError> {
        let pool = self.pool().await?;
        tracing::debug!(database = %self.identifier, "writing test data");
        sqlx::query("INSERT INTO test (test) VALUES ('test')")
            .execute(&pool)
            .await?;
        Ok(())
    }

    async fn setup_test_table(&self) -> Result<(), DatabaseError> {
        tracing::debug!(database = %self.identifier, "setting up test table");
        let connected = self.pool.lock().await.is_some();
        if !connected {
            self.connect().await?;
        }
        let result = self.create_test_table().await;
        if !connected {
            self.close().await?;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_config_defaults() {
        let config = PostgresConfig::new("localhost", 5432, "app");

        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5432);
        assert_eq!(config.database, "app");
        assert!(!config.use_ssl);
        assert_eq!(config.connection_timeout, DEFAULT_CONNECTION_TIMEOUT);
    }

    #[test]
    fn test_postgres_config_identifier() {
        let config = PostgresConfig::new("db.internal", 5433, "orders");
        assert_eq!(config.identifier(), "db.internal:5433/orders");
    }

    #[test]
    fn test_postgres_config_builder() {
        let config = PostgresConfig::new("localhost", 5432, "app")
            .with_credentials("monitor", "s3cret")
            .with_ssl(true)
            .with_connection_timeout(Duration::from_secs(10));

        assert_eq!(config.username, "monitor");
        assert_eq!(config.password, "s3cret");
        assert!(config.use_ssl);
        assert_eq!(config.connection_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_postgres_config_serde_defaults() {
        let config: PostgresConfig = serde_yaml::from_str("host: localhost\ndatabase: app\n").unwrap();

        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.username.is_empty());
        assert!(!config.use_ssl);
        assert_eq!(config.connection_timeout, DEFAULT_CONNECTION_TIMEOUT);
    }

    #[tokio::test]
    async fn test_read_requires_connection() {
        let db = PostgresDatabase::new(PostgresConfig::new("localhost", 5432, "app"));

        let err = db.test_read().await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotConnected));
    }

    #[tokio::test]
    async fn test_close_without_connection_is_noop() {
        let db = PostgresDatabase::new(PostgresConfig::new("localhost", 5432, "app"));
        assert!(db.close().await.is_ok());
    }
}
