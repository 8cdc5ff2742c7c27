//! Core database capability trait and error types.

use thiserror::Error;

/// Errors that can occur during database probe operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Driver-level error (connection, query, TLS).
    #[error("database error: {0}")]
    Driver(#[from] sqlx::Error),

    /// Timeout elapsed.
    #[error("timeout elapsed")]
    Timeout,

    /// Operation requires an established connection.
    #[error("not connected")]
    NotConnected,
}

/// Capability trait for database targets.
///
/// Implementations hold their connection internally. The probe engine drives
/// `connect` → `test_read` → `test_write` → `close` each cycle; any error is
/// a probe failure for that step, never a reason to stop the engine.
///
/// `test_read` and `test_write` require a prior `connect` and return
/// [`DatabaseError::NotConnected`] otherwise. `setup_test_table` manages its
/// own connection so the setup path works standalone.
#[async_trait::async_trait]
pub trait Database: Send + Sync + 'static {
    /// Unique identifier for this target. Doubles as the result cache key.
    fn identifier(&self) -> &str;

    /// Establish a connection to the target.
    async fn connect(&self) -> Result<(), DatabaseError>;

    /// Close the connection. No-op when not connected.
    async fn close(&self) -> Result<(), DatabaseError>;

    /// Verify the target serves reads by querying the test table.
    async fn test_read(&self) -> Result<(), DatabaseError>;

    /// Verify the target accepts writes by inserting into the test table.
    async fn test_write(&self) -> Result<(), DatabaseError>;

    /// Create the test table required by the read/write probes.
    async fn setup_test_table(&self) -> Result<(), DatabaseError>;
}
