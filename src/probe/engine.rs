//! Probe scheduling engine.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::config::MonitorConfig;
use crate::database::{Database, DatabaseError};

use super::result::ProbeResult;

/// Aggregated setup failures across all targets.
///
/// Setup keeps going past individual failures so one broken target does not
/// block the rest.
#[derive(Debug, Error)]
#[error("setting up databases: {}", describe_failures(.failures))]
pub struct SetupError {
    /// Per-target failures as (identifier, error) pairs.
    pub failures: Vec<(String, DatabaseError)>,
}

fn describe_failures(failures: &[(String, DatabaseError)]) -> String {
    failures
        .iter()
        .map(|(identifier, error)| format!("{identifier}: {error}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Drives periodic probe rounds against all configured targets.
///
/// Each round spawns one task per target; a slow or failing target never
/// delays the others. Results are streamed over the channel returned by
/// [`ProbeEngine::run`]; the stream ends only after cancellation and after
/// in-flight probes had their chance to finish.
pub struct ProbeEngine {
    interval: Duration,
    test_timeout: Duration,
    channel_capacity: usize,
    targets: Vec<Arc<dyn Database>>,
}

impl ProbeEngine {
    /// Create an engine from monitor configuration and target set.
    pub fn new(config: &MonitorConfig, targets: Vec<Arc<dyn Database>>) -> Self {
        Self {
            interval: config.test_interval,
            test_timeout: config.test_timeout,
            channel_capacity: config.channel_capacity,
            targets,
        }
    }

    /// Start the probe loop and return the result stream.
    ///
    /// The loop runs until `cancel` is triggered, then closes all targets and
    /// drops its sender; the receiver sees end-of-stream once in-flight
    /// probes have completed.
    pub fn run(&self, cancel: CancellationToken) -> mpsc::Receiver<ProbeResult> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let targets = self.targets.clone();
        let interval = self.interval;
        let test_timeout = self.test_timeout;
        tokio::spawn(run_loop(targets, interval, test_timeout, tx, cancel));
        rx
    }

    /// Create the test table on every target, collecting failures.
    ///
    /// # Errors
    /// Returns `SetupError` listing each target that failed; the remaining
    /// targets are still set up.
    pub async fn setup(&self) -> Result<(), SetupError> {
        let mut failures = Vec::new();

        for target in &self.targets {
            tracing::info!(database = %target.identifier(), "setting up test table");
            if let Err(error) = target.setup_test_table().await {
                tracing::error!(database = %target.identifier(), %error, "setup failed");
                failures.push((target.identifier().to_string(), error));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SetupError { failures })
        }
    }
}

async fn run_loop(
    targets: Vec<Arc<dyn Database>>,
    interval: Duration,
    test_timeout: Duration,
    tx: mpsc::Sender<ProbeResult>,
    cancel: CancellationToken,
) {
    tracing::info!(targets = targets.len(), "starting database tester");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        for target in &targets {
            let target = Arc::clone(target);
            let tx = tx.clone();
            let cancel = cancel.clone();
            tokio::spawn(probe_target(target, test_timeout, tx, cancel));
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    tracing::debug!("received termination signal, closing databases");
    for target in &targets {
        if let Err(error) = target.close().await {
            tracing::warn!(database = %target.identifier(), %error, "closing database failed");
        }
    }
    // The loop's sender drops here; probe tasks hold the remaining clones.
}

/// Run one connect/read/write probe against a single target.
///
/// Steps short-circuit: a failed step emits the result accumulated so far.
/// After cancellation the probe abandons emission entirely.
async fn probe_target(
    target: Arc<dyn Database>,
    test_timeout: Duration,
    tx: mpsc::Sender<ProbeResult>,
    cancel: CancellationToken,
) {
    let mut result = ProbeResult::new(target.identifier());

    let started = Instant::now();
    let connected = target.connect().await;
    if cancel.is_cancelled() {
        return;
    }
    if let Err(error) = connected {
        tracing::error!(database = %result.database, %error, "connecting failed");
        emit(&tx, &cancel, result).await;
        return;
    }
    result.connection_time = started.elapsed();
    result.connectable = true;

    let started = Instant::now();
    let read = bounded(test_timeout, target.test_read()).await;
    if cancel.is_cancelled() {
        let _ = target.close().await;
        return;
    }
    if let Err(error) = read {
        tracing::error!(database = %result.database, %error, "reading failed");
        let _ = target.close().await;
        emit(&tx, &cancel, result).await;
        return;
    }
    result.read_time = started.elapsed();
    result.readable = true;

    let started = Instant::now();
    let written = bounded(test_timeout, target.test_write()).await;
    if cancel.is_cancelled() {
        let _ = target.close().await;
        return;
    }
    if let Err(error) = written {
        tracing::error!(database = %result.database, %error, "writing failed");
        let _ = target.close().await;
        emit(&tx, &cancel, result).await;
        return;
    }
    result.write_time = started.elapsed();
    result.writable = true;

    let _ = target.close().await;
    emit(&tx, &cancel, result).await;
}

async fn bounded<F>(limit: Duration, operation: F) -> Result<(), DatabaseError>
where
    F: Future<Output = Result<(), DatabaseError>>,
{
    match timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => Err(DatabaseError::Timeout),
    }
}

async fn emit(tx: &mpsc::Sender<ProbeResult>, cancel: &CancellationToken, result: ProbeResult) {
    if cancel.is_cancelled() {
        return;
    }
    if tx.send(result).await.is_err() {
        tracing::warn!("result receiver dropped");
    }
}
