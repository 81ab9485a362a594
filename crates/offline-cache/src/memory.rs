//! In-memory cache storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use offline_core::{HeaderMap, Method, Request, Response};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::key::{vary_matches, RequestKey};
use crate::store::{CacheError, CacheHandle, CacheResult, CacheStorage, CachedResponse};

/// Counters for store operations.
#[derive(Debug, Default)]
pub struct StoreStats {
    opens: AtomicU64,
    reads: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
    listings: AtomicU64,
}

/// Point-in-time copy of [`StoreStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StoreStatsSnapshot {
    pub opens: u64,
    pub reads: u64,
    pub writes: u64,
    pub deletes: u64,
    pub listings: u64,
}

impl StoreStatsSnapshot {
    /// Total number of operations.
    pub fn total(&self) -> u64 {
        self.opens + self.reads + self.writes + self.deletes + self.listings
    }
}

impl StoreStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counter values.
    pub fn snapshot(&self) -> StoreStatsSnapshot {
        StoreStatsSnapshot {
            opens: self.opens.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            listings: self.listings.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredEntry {
    request_headers: HeaderMap,
    response: Response,
    stored_at: DateTime<Utc>,
}

/// One in-memory cache generation.
#[derive(Debug)]
pub struct MemoryCache {
    name: String,
    entries: RwLock<HashMap<RequestKey, StoredEntry>>,
    stats: Arc<StoreStats>,
}

impl MemoryCache {
    fn new(name: &str, stats: Arc<StoreStats>) -> Self {
        Self {
            name: name.to_string(),
            entries: RwLock::new(HashMap::new()),
            stats,
        }
    }
}

#[async_trait]
impl CacheHandle for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_request(&self, request: &Request) -> CacheResult<Option<CachedResponse>> {
        StoreStats::bump(&self.stats.reads);
        let key = RequestKey::from_request(request);
        let entries = self.entries.read().await;

        Ok(entries
            .get(&key)
            .filter(|entry| vary_matches(&entry.response, &entry.request_headers, &request.headers))
            .map(|entry| CachedResponse {
                response: entry.response.snapshot(),
                stored_at: entry.stored_at,
            }))
    }

    async fn put(&self, request: &Request, response: &Response) -> CacheResult<()> {
        if request.method != Method::GET {
            return Err(CacheError::UnsupportedMethod(request.method.clone()));
        }

        StoreStats::bump(&self.stats.writes);
        let entry = StoredEntry {
            request_headers: request.headers.clone(),
            response: response.snapshot(),
            stored_at: Utc::now(),
        };
        self.entries
            .write()
            .await
            .insert(RequestKey::from_request(request), entry);
        Ok(())
    }

    async fn delete(&self, request: &Request) -> CacheResult<bool> {
        StoreStats::bump(&self.stats.deletes);
        let key = RequestKey::from_request(request);
        Ok(self.entries.write().await.remove(&key).is_some())
    }

    async fn keys(&self) -> CacheResult<Vec<RequestKey>> {
        StoreStats::bump(&self.stats.listings);
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}

/// In-process cache storage.
///
/// Generations live as long as the storage value. A handle obtained before
/// its generation is deleted keeps working but is detached from storage.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    caches: RwLock<Vec<(String, Arc<MemoryCache>)>>,
    stats: Arc<StoreStats>,
}

impl MemoryCacheStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Operation counters.
    pub fn stats(&self) -> StoreStatsSnapshot {
        self.stats.snapshot()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn CacheHandle>> {
        StoreStats::bump(&self.stats.opens);
        let mut caches = self.caches.write().await;

        if let Some((_, cache)) = caches.iter().find(|(n, _)| n == name) {
            return Ok(cache.clone() as Arc<dyn CacheHandle>);
        }

        tracing::debug!(generation = name, "creating cache generation");
        let cache = Arc::new(MemoryCache::new(name, self.stats.clone()));
        caches.push((name.to_string(), cache.clone()));
        Ok(cache as Arc<dyn CacheHandle>)
    }

    async fn open_existing(&self, name: &str) -> CacheResult<Option<Arc<dyn CacheHandle>>> {
        StoreStats::bump(&self.stats.opens);
        let caches = self.caches.read().await;
        Ok(caches
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, cache)| cache.clone() as Arc<dyn CacheHandle>))
    }

    async fn has(&self, name: &str) -> CacheResult<bool> {
        StoreStats::bump(&self.stats.listings);
        Ok(self.caches.read().await.iter().any(|(n, _)| n == name))
    }

    async fn delete(&self, name: &str) -> CacheResult<bool> {
        StoreStats::bump(&self.stats.deletes);
        let mut caches = self.caches.write().await;
        let before = caches.len();
        caches.retain(|(n, _)| n != name);
        Ok(caches.len() != before)
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        StoreStats::bump(&self.stats.listings);
        Ok(self.caches.read().await.iter().map(|(n, _)| n.clone()).collect())
    }
}
