//! Probe outcome value type.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single probe against one database target.
///
/// Capability flags imply each other in probe order: `writable` is only set
/// when `readable` is, and `readable` only when `connectable` is. Timings
/// stay zero for steps that failed or never ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Target identifier.
    pub database: String,

    /// Whether a connection was established.
    pub connectable: bool,

    /// Time taken to connect.
    #[serde(with = "nanos")]
    pub connection_time: Duration,

    /// Whether the write probe succeeded.
    pub writable: bool,

    /// Time taken by the write probe.
    #[serde(with = "nanos")]
    pub write_time: Duration,

    /// Whether the read probe succeeded.
    pub readable: bool,

    /// Time taken by the read probe.
    #[serde(with = "nanos")]
    pub read_time: Duration,

    /// When the probe started.
    pub timestamp: DateTime<Utc>,
}

impl ProbeResult {
    /// Create a result with all capabilities unset, timestamped now.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            connectable: false,
            connection_time: Duration::ZERO,
            writable: false,
            write_time: Duration::ZERO,
            readable: false,
            read_time: Duration::ZERO,
            timestamp: Utc::now(),
        }
    }
}

/// Durations on the wire are integer nanosecond counts.
mod nanos {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_nanos() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos))
    }
}
