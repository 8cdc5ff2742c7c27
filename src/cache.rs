//! In-memory probe result cache.
//!
//! Keeps the latest result per target and sweeps out entries older than the
//! invalidation time. The sweep runs on every received result, so a cache
//! that stops receiving keeps its last state until the next event.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;

use crate::probe::ProbeResult;

/// Shared cache of the most recent probe result per target identifier.
#[derive(Debug, Clone)]
pub struct ResultCache {
    entries: Arc<RwLock<HashMap<String, ProbeResult>>>,
    ttl: chrono::Duration,
}

impl ResultCache {
    /// Create a cache whose entries expire after `invalidation_time`.
    pub fn new(invalidation_time: Duration) -> Self {
        let ttl = chrono::Duration::from_std(invalidation_time)
            .unwrap_or(chrono::Duration::MAX);
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Consume the result stream until it closes or `cancel` is triggered.
    ///
    /// Each received result overwrites the previous entry for its target and
    /// triggers an expiry sweep over the whole cache.
    pub async fn collect(&self, mut rx: mpsc::Receiver<ProbeResult>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("result collection cancelled");
                    break;
                }
                received = rx.recv() => {
                    match received {
                        Some(result) => self.store(result).await,
                        None => {
                            tracing::debug!("result stream closed");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Clone of the current cache contents.
    pub async fn snapshot(&self) -> HashMap<String, ProbeResult> {
        self.entries.read().await.clone()
    }

    async fn store(&self, result: ProbeResult) {
        tracing::debug!(database = %result.database, "caching probe result");
        let mut entries = self.entries.write().await;
        entries.insert(result.database.clone(), result);

        let now = Utc::now();
        let ttl = self.ttl;
        entries.retain(|_, cached| now - cached.timestamp <= ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_collector(
        cache: &ResultCache,
        rx: mpsc::Receiver<ProbeResult>,
        cancel: &CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let cache = cache.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { cache.collect(rx, cancel).await })
    }

    #[tokio::test]
    async fn test_snapshot_empty() {
        let cache = ResultCache::new(Duration::from_secs(60));
        assert!(cache.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let cache = ResultCache::new(Duration::from_secs(60));
        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let collector = spawn_collector(&cache, rx, &cancel);

        let first = ProbeResult::new("localhost:5432/app");
        tx.send(first).await.unwrap();

        let mut second = ProbeResult::new("localhost:5432/app");
        second.connectable = true;
        second.readable = true;
        tx.send(second).await.unwrap();

        drop(tx);
        collector.await.unwrap();

        let snapshot = cache.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot["localhost:5432/app"].connectable);
        assert!(snapshot["localhost:5432/app"].readable);
    }

    #[tokio::test]
    async fn test_expired_entries_swept_on_next_event() {
        let cache = ResultCache::new(Duration::from_millis(50));
        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let collector = spawn_collector(&cache, rx, &cancel);

        tx.send(ProbeResult::new("stale")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        tx.send(ProbeResult::new("fresh")).await.unwrap();

        drop(tx);
        collector.await.unwrap();

        let snapshot = cache.snapshot().await;
        assert!(!snapshot.contains_key("stale"));
        assert!(snapshot.contains_key("fresh"));
    }

    #[tokio::test]
    async fn test_entries_survive_stream_close() {
        let cache = ResultCache::new(Duration::from_secs(60));
        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let collector = spawn_collector(&cache, rx, &cancel);

        tx.send(ProbeResult::new("kept")).await.unwrap();
        drop(tx);
        collector.await.unwrap();

        // Closing the stream retains the cache contents
        assert!(cache.snapshot().await.contains_key("kept"));
    }

    #[tokio::test]
    async fn test_cancellation_stops_collection() {
        let cache = ResultCache::new(Duration::from_secs(60));
        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let collector = spawn_collector(&cache, rx, &cancel);

        cancel.cancel();
        // Sender still open; collection must end on cancellation alone.
        tokio::time::timeout(Duration::from_secs(1), collector)
            .await
            .expect("collector ends on cancellation")
            .unwrap();
        drop(tx);
    }
}
