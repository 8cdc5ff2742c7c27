//! Probe engine and result types.
//!
//! The engine runs one probe round per interval, each target probed in its
//! own task, and streams outcomes over a bounded channel.

pub mod engine;
pub mod result;

pub use engine::{ProbeEngine, SetupError};
pub use result::ProbeResult;
