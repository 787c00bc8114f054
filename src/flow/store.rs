//! Exchange store: headers removed from inbound requests, keyed by exchange.
//!
//! # Responsibilities
//! - Remember which headers were stripped before forwarding upstream
//! - Hand them back exactly once when the response arrives
//! - Evict entries whose response never came
//!
//! # Design Decisions
//! - Injected and owned by the interceptor; no process-global map
//! - `DashMap` shard locks make `put`/`take_if_present` mutually exclusive per key
//! - Entries are never read without being removed

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{HeaderName, HeaderValue};
use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::flow::exchange::ExchangeId;
use crate::http::headers::HeaderList;
use crate::observability::metrics;

/// Header name → value pairs removed from a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovedHeaders(HeaderList);

impl RemovedHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the value for `name`.
    pub fn insert(&mut self, name: HeaderName, value: HeaderValue) {
        self.0.set(name, value);
    }

    pub fn get(&self, name: &HeaderName) -> Option<HeaderValue> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.0.iter()
    }
}

#[derive(Debug)]
struct StoredEntry {
    headers: RemovedHeaders,
    stored_at: Instant,
}

/// A thread-safe map of exchange id → removed headers.
#[derive(Debug, Clone, Default)]
pub struct ExchangeStore {
    inner: Arc<DashMap<ExchangeId, StoredEntry>>,
}

impl ExchangeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `id`.
    pub fn put(&self, id: ExchangeId, headers: RemovedHeaders) {
        self.inner.insert(
            id,
            StoredEntry {
                headers,
                stored_at: Instant::now(),
            },
        );
        metrics::record_store_size(self.inner.len());
    }

    /// Atomically remove and return the entry for `id`, if any.
    pub fn take_if_present(&self, id: &ExchangeId) -> Option<RemovedHeaders> {
        let (_, entry) = self.inner.remove(id)?;
        metrics::record_store_size(self.inner.len());
        Some(entry.headers)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop entries stored more than `ttl` ago. Returns how many were evicted.
    pub fn evict_older_than(&self, ttl: Duration) -> usize {
        let before = self.inner.len();
        self.inner.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        let evicted = before.saturating_sub(self.inner.len());
        if evicted > 0 {
            metrics::record_store_evictions(evicted);
            metrics::record_store_size(self.inner.len());
        }
        evicted
    }

    /// Periodically evict expired entries until shutdown.
    pub async fn run_sweeper(
        self,
        ttl: Duration,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.evict_older_than(ttl);
                    if evicted > 0 {
                        tracing::warn!(
                            evicted,
                            ttl_secs = ttl.as_secs(),
                            "Evicted stored headers for exchanges that never completed"
                        );
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Store sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn removed(value: &'static str) -> RemovedHeaders {
        let mut headers = RemovedHeaders::new();
        headers.insert(HeaderName::from_static("x-request-id"), HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn take_consumes_entry_once() {
        let store = ExchangeStore::new();
        let id = ExchangeId::new();
        store.put(id, removed("abc123"));

        let taken = store.take_if_present(&id).unwrap();
        assert_eq!(
            taken.get(&HeaderName::from_static("x-request-id")).unwrap(),
            "abc123"
        );
        assert!(store.take_if_present(&id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn take_missing_is_absent() {
        let store = ExchangeStore::new();
        assert!(store.take_if_present(&ExchangeId::new()).is_none());
    }

    #[test]
    fn put_overwrites() {
        let store = ExchangeStore::new();
        let id = ExchangeId::new();
        store.put(id, removed("first"));
        store.put(id, removed("second"));
        assert_eq!(store.len(), 1);
        let taken = store.take_if_present(&id).unwrap();
        assert_eq!(taken.get(&HeaderName::from_static("x-request-id")).unwrap(), "second");
    }

    #[test]
    fn insert_overwrites_same_name() {
        let mut headers = removed("first");
        headers.insert(HeaderName::from_static("x-request-id"), HeaderValue::from_static("second"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn eviction_drops_expired_entries() {
        let store = ExchangeStore::new();
        store.put(ExchangeId::new(), removed("a"));
        store.put(ExchangeId::new(), removed("b"));

        assert_eq!(store.evict_older_than(Duration::from_secs(3600)), 0);
        assert_eq!(store.evict_older_than(Duration::ZERO), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn concurrent_put_and_take() {
        let store = ExchangeStore::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        let id = ExchangeId::new();
                        store.put(id, removed("x"));
                        assert!(store.take_if_present(&id).is_some());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn sweeper_stops_on_shutdown() {
        let store = ExchangeStore::new();
        let (tx, rx) = broadcast::channel(1);
        let task = tokio::spawn(store.run_sweeper(
            Duration::from_secs(60),
            Duration::from_millis(10),
            rx,
        ));
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
