//! SQLite probe target.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::sync::Mutex;

use super::traits::{Database, DatabaseError};

/// Configuration for a SQLite probe target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Database file path.
    pub file_path: String,
}

impl SqliteConfig {
    /// Create a new SQLite target configuration.
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    /// Unique identifier for this target: the file path.
    pub fn identifier(&self) -> String {
        self.file_path.clone()
    }
}

/// SQLite probe target.
pub struct SqliteDatabase {
    config: SqliteConfig,
    pool: Mutex<Option<SqlitePool>>,
}

impl SqliteDatabase {
    /// Create a new SQLite target from its configuration.
    pub fn new(config: SqliteConfig) -> Self {
        Self {
            config,
            pool: Mutex::new(None),
        }
    }

    async fn pool(&self) -> Result<SqlitePool, DatabaseError> {
        (*self.pool.lock().await)
            .clone()
            .ok_or(DatabaseError::NotConnected)
    }

    async fn create_test_table(&self) -> Result<(), DatabaseError> {
        let pool = self.pool().await?;
        tracing::debug!(database = %self.config.file_path, "dropping test table");
        sqlx::query("DROP TABLE IF EXISTS test").execute(&pool).await?;
        tracing::debug!(database = %self.config.file_path, "creating test table");
        sqlx::query("CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT)")
            .execute(&pool)
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDatabase")
            .field("file_path", &self.config.file_path)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Database for SqliteDatabase {
    fn identifier(&self) -> &str {
        &self.config.file_path
    }

    async fn connect(&self) -> Result<(), DatabaseError> {
        tracing::debug!(database = %self.config.file_path, "connecting to sqlite");
        let options = SqliteConnectOptions::new()
            .filename(&self.config.file_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        *self.pool.lock().await = Some(pool);
        Ok(())
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        let pool = self.pool.lock().await.take();
        if let Some(pool) = pool {
            tracing::debug!(database = %self.config.file_path, "closing sqlite connection");
            pool.close().await;
        }
        Ok(())
    }

    async fn test_read(&self) -> Result<(), DatabaseError> {
        let pool = self.pool().await?;
        tracing::debug!(database = %self.config.file_path, "reading test data");
        sqlx::query("SELECT id, name FROM test WHERE id = 1")
            .fetch_all(&pool)
            .await?;
        Ok(())
    }

    async fn test_write(&self) -> Result<(), DatabaseError> {
        let pool = self.pool().await?;
        tracing::debug!(database = %self.config.file_path, "writing test data");
        // Upsert: the fixed id must not violate the primary key on later cycles.
        sqlx::query("INSERT OR REPLACE INTO test (id, name) VALUES (1, 'test')")
            .execute(&pool)
            .await?;
        Ok(())
    }

    async fn setup_test_table(&self) -> Result<(), DatabaseError> {
        tracing::debug!(database = %self.config.file_path, "setting up test table");
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
