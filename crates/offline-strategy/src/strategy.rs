//! Caching strategies against the runtime generation.

use std::sync::Arc;
use std::time::Duration;

use offline_cache::{match_in, CacheResult, CacheStorage, CachedResponse};
use offline_core::{Request, Response};
use offline_fetch::Fetcher;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::revalidate::Revalidator;
use crate::sequencer::{WriteSequencer, WriteTicket};

/// How to combine the runtime cache and the network for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CachingStrategy {
    /// Serve a cached entry without touching the network; fetch on a miss.
    CacheFirst,
    /// Fetch first; fall back to the cached entry when unreachable.
    NetworkFirst,
    /// Serve a cached entry immediately and refresh it in the background.
    StaleWhileRevalidate,
}

impl CachingStrategy {
    /// Strategy name used in logs and debug headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CacheFirst => "cache-first",
            Self::NetworkFirst => "network-first",
            Self::StaleWhileRevalidate => "stale-while-revalidate",
        }
    }
}

impl std::fmt::Display for CachingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a strategy got its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServedFrom {
    Network,
    RuntimeCache,
}

/// A response produced by a strategy.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: Response,
    pub source: ServedFrom,
    /// Entry age, for cached responses.
    pub age: Option<Duration>,
}

impl Served {
    fn network(response: Response) -> Self {
        Self {
            response,
            source: ServedFrom::Network,
            age: None,
        }
    }

    fn cached(entry: CachedResponse) -> Self {
        Self {
            age: Some(entry.age()),
            response: entry.response,
            source: ServedFrom::RuntimeCache,
        }
    }
}

struct Shared {
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    runtime: String,
    writes: WriteSequencer,
}

impl Shared {
    async fn lookup(&self, request: &Request) -> CacheResult<Option<CachedResponse>> {
        match_in(self.storage.as_ref(), &self.runtime, request).await
    }

    /// Fetch and store a successful response.
    ///
    /// `None` means the network could not be reached. Error statuses are
    /// returned but never stored.
    async fn fetch_and_store(
        &self,
        request: &Request,
        ticket: WriteTicket,
    ) -> CacheResult<Option<Response>> {
        let response = match self.fetcher.fetch(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(
                    url = %request.url,
                    error = %err,
                    connectivity = err.is_connectivity(),
                    "fetch failed"
                );
                return Ok(None);
            }
        };

        if response.is_success() {
            let cache = self.storage.open(&self.runtime).await?;
            self.writes
                .write(cache.as_ref(), request, &response, ticket)
                .await?;
        } else {
            tracing::debug!(url = %request.url, status = %response.status, "not caching error response");
        }

        Ok(Some(response))
    }
}

/// Runs caching strategies against one runtime generation.
pub struct StrategyExecutor {
    shared: Arc<Shared>,
    revalidator: Arc<Revalidator>,
}

impl StrategyExecutor {
    /// Create an executor writing to the runtime generation `runtime`.
    pub fn new(
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        runtime: impl Into<String>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                storage,
                fetcher,
                runtime: runtime.into(),
                writes: WriteSequencer::new(),
            }),
            revalidator: Arc::new(Revalidator::new()),
        }
    }

    /// Runtime generation name.
    pub fn runtime(&self) -> &str {
        &self.shared.runtime
    }

    /// Background revalidation tracker.
    pub fn revalidator(&self) -> &Arc<Revalidator> {
        &self.revalidator
    }

    /// Run `strategy` for `request`.
    pub async fn run(
        &self,
        strategy: CachingStrategy,
        request: &Request,
    ) -> CacheResult<Option<Served>> {
        match strategy {
            CachingStrategy::CacheFirst => self.cache_first(request).await,
            CachingStrategy::NetworkFirst => self.network_first(request).await,
            CachingStrategy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
        }
    }

    /// Serve from the runtime cache, fetching only on a miss.
    pub async fn cache_first(&self, request: &Request) -> CacheResult<Option<Served>> {
        if let Some(hit) = self.shared.lookup(request).await? {
            return Ok(Some(Served::cached(hit)));
        }

        let ticket = self.shared.writes.ticket();
        Ok(self
            .shared
            .fetch_and_store(request, ticket)
            .await?
            .map(Served::network))
    }

    /// Fetch, falling back to the runtime cache when the network is unreachable.
    pub async fn network_first(&self, request: &Request) -> CacheResult<Option<Served>> {
        let ticket = self.shared.writes.ticket();
        if let Some(response) = self.shared.fetch_and_store(request, ticket).await? {
            return Ok(Some(Served::network(response)));
        }

        Ok(self.shared.lookup(request).await?.map(Served::cached))
    }

    /// Serve the cached entry if any and refresh it in the background.
    ///
    /// On a miss the caller waits for the background fetch.
    pub async fn stale_while_revalidate(&self, request: &Request) -> CacheResult<Option<Served>> {
        let cached = self.shared.lookup(request).await?;

        match cached {
            Some(hit) => {
                self.revalidate(request, None);
                Ok(Some(Served::cached(hit)))
            }
            None => {
                let (tx, rx) = oneshot::channel();
                self.revalidate(request, Some(tx));
                match rx.await {
                    Ok(result) => Ok(result?.map(Served::network)),
                    Err(_) => Ok(None),
                }
            }
        }
    }

    fn revalidate(
        &self,
        request: &Request,
        reply: Option<oneshot::Sender<CacheResult<Option<Response>>>>,
    ) {
        let ticket = self.shared.writes.ticket();
        let shared = Arc::clone(&self.shared);
        let request = request.clone();

        self.revalidator.spawn(async move {
            let result = shared.fetch_and_store(&request, ticket).await;
            match reply {
                Some(reply) => {
                    if let Err(Err(err)) = reply.send(result) {
                        tracing::warn!(url = %request.url, error = %err, "revalidation failed after caller left");
                    }
                }
                None => {
                    if let Err(err) = result {
                        tracing::warn!(url = %request.url, error = %err, "background revalidation failed");
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use async_trait::async_trait;
    use offline_cache::{CacheError, CacheHandle, MemoryCacheStorage, RequestKey};
    use offline_core::{StatusCode, Url};
    use offline_fetch::{FetchError, ScriptedFetcher};

    use super::*;

    const RUNTIME: &str = "runtime-v1";
    const URL: &str = "https://app.example/data.json";

    struct Fixture {
        storage: Arc<MemoryCacheStorage>,
        fetcher: Arc<ScriptedFetcher>,
        executor: StrategyExecutor,
    }

    fn fixture() -> Fixture {
        let storage = Arc::new(MemoryCacheStorage::new());
        let fetcher = Arc::new(ScriptedFetcher::new());
        let executor = StrategyExecutor::new(storage.clone(), fetcher.clone(), RUNTIME);
        Fixture {
            storage,
            fetcher,
            executor,
        }
    }

    fn request() -> Request {
        Request::get(Url::parse(URL).unwrap())
    }

    /// How puts behave in [`GatedStorage`].
    #[derive(Clone, Copy)]
    enum Puts {
        SlowFor(&'static str),
        Fail,
    }

    /// Memory storage whose puts can be slowed down per path or failed.
    struct GatedStorage {
        inner: MemoryCacheStorage,
        puts: Puts,
    }

    struct GatedCache {
        inner: Arc<dyn CacheHandle>,
        puts: Puts,
    }

    #[async_trait]
    impl CacheHandle for GatedCache {
        fn name(&self) -> &str {
            self.inner.name()
        }

        async fn match_request(&self, request: &Request) -> CacheResult<Option<CachedResponse>> {
            self.inner.match_request(request).await
        }

        async fn put(&self, request: &Request, response: &Response) -> CacheResult<()> {
            match self.puts {
                Puts::SlowFor(path) if request.url.path() == path => {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
                Puts::SlowFor(_) => {}
                Puts::Fail => return Err(CacheError::Storage("disk full".into())),
            }
            self.inner.put(request, response).await
        }

        async fn delete(&self, request: &Request) -> CacheResult<bool> {
            self.inner.delete(request).await
        }

        async fn keys(&self) -> CacheResult<Vec<RequestKey>> {
            self.inner.keys().await
        }
    }

    impl GatedStorage {
        fn gate(&self, inner: Arc<dyn CacheHandle>) -> Arc<dyn CacheHandle> {
            Arc::new(GatedCache {
                inner,
                puts: self.puts,
            })
        }
    }

    #[async_trait]
    impl CacheStorage for GatedStorage {
        async fn open(&self, name: &str) -> CacheResult<Arc<dyn CacheHandle>> {
            Ok(self.gate(self.inner.open(name).await?))
        }

        async fn open_existing(&self, name: &str) -> CacheResult<Option<Arc<dyn CacheHandle>>> {
            Ok(self.inner.open_existing(name).await?.map(|cache| self.gate(cache)))
        }

        async fn has(&self, name: &str) -> CacheResult<bool> {
            self.inner.has(name).await
        }

        async fn delete(&self, name: &str) -> CacheResult<bool> {
            self.inner.delete(name).await
        }

        async fn keys(&self) -> CacheResult<Vec<String>> {
            self.inner.keys().await
        }
    }

    fn gated(puts: Puts) -> (Arc<GatedStorage>, Arc<ScriptedFetcher>, Arc<StrategyExecutor>) {
        let storage = Arc::new(GatedStorage {
            inner: MemoryCacheStorage::new(),
            puts,
        });
        let fetcher = Arc::new(ScriptedFetcher::new());
        let executor = Arc::new(StrategyExecutor::new(storage.clone(), fetcher.clone(), RUNTIME));
        (storage, fetcher, executor)
    }

    async fn seed(storage: &MemoryCacheStorage, body: &'static str) {
        let cache = storage.open(RUNTIME).await.unwrap();
        cache.put(&request(), &Response::json(body)).await.unwrap();
    }

    async fn stored_body(storage: &MemoryCacheStorage) -> Option<String> {
        let cache = storage.open_existing(RUNTIME).await.unwrap()?;
        let entry = cache.match_request(&request()).await.unwrap()?;
        Some(entry.response.text().unwrap().to_string())
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(CachingStrategy::CacheFirst.to_string(), "cache-first");
        assert_eq!(
            serde_json::to_string(&CachingStrategy::StaleWhileRevalidate).unwrap(),
            r#""stale-while-revalidate""#
        );
    }

    // === Cache-First Tests ===

    #[tokio::test]
    async fn test_cache_first_hit_skips_network() {
        let f = fixture();
        seed(&f.storage, "cached").await;
        f.fetcher.respond(URL, Response::json("fresh"));

        let served = f.executor.cache_first(&request()).await.unwrap().unwrap();
        assert_eq!(served.source, ServedFrom::RuntimeCache);
        assert_eq!(served.response.text().unwrap(), "cached");
        assert!(served.age.is_some());
        assert_eq!(f.fetcher.calls_to(URL), 0);
    }

    #[tokio::test]
    async fn test_cache_first_miss_fetches_and_stores() {
        let f = fixture();
        f.fetcher.respond(URL, Response::json("fresh"));

        let served = f.executor.cache_first(&request()).await.unwrap().unwrap();
        assert_eq!(served.source, ServedFrom::Network);
        assert_eq!(stored_body(&f.storage).await.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_cache_first_error_status_passes_through_uncached() {
        let f = fixture();
        f.fetcher.respond(URL, Response::new(StatusCode::NOT_FOUND));

        let served = f.executor.cache_first(&request()).await.unwrap().unwrap();
        assert_eq!(served.response.status, StatusCode::NOT_FOUND);
        assert_eq!(stored_body(&f.storage).await, None);
    }

    #[tokio::test]
    async fn test_cache_first_unreachable_is_no_result() {
        let f = fixture();
        f.fetcher.fail(URL, FetchError::Connection("down".into()));
        assert!(f.executor.cache_first(&request()).await.unwrap().is_none());
    }

    // === Network-First Tests ===

    #[tokio::test]
    async fn test_network_first_prefers_network() {
        let f = fixture();
        seed(&f.storage, "cached").await;
        f.fetcher.respond(URL, Response::json("fresh"));

        let served = f.executor.network_first(&request()).await.unwrap().unwrap();
        assert_eq!(served.source, ServedFrom::Network);
        assert_eq!(served.response.text().unwrap(), "fresh");
        assert_eq!(stored_body(&f.storage).await.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_network_first_unreachable_uses_cache() {
        let f = fixture();
        seed(&f.storage, "cached").await;
        f.fetcher.set_offline(true);

        let served = f.executor.network_first(&request()).await.unwrap().unwrap();
        assert_eq!(served.source, ServedFrom::RuntimeCache);
        assert_eq!(served.response.text().unwrap(), "cached");
    }

    #[tokio::test]
    async fn test_network_first_server_error_not_replaced_by_cache() {
        let f = fixture();
        seed(&f.storage, "cached").await;
        f.fetcher.respond(URL, Response::new(StatusCode::INTERNAL_SERVER_ERROR));

        let served = f.executor.network_first(&request()).await.unwrap().unwrap();
        assert_eq!(served.response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(stored_body(&f.storage).await.as_deref(), Some("cached"));
    }

    #[tokio::test]
    async fn test_network_first_unreachable_and_empty() {
        let f = fixture();
        f.fetcher.set_offline(true);
        assert!(f.executor.network_first(&request()).await.unwrap().is_none());
        assert!(!f.storage.has(RUNTIME).await.unwrap());
    }

    // === Stale-While-Revalidate Tests ===

    #[tokio::test]
    async fn test_swr_hit_returns_cached_and_refreshes() {
        let f = fixture();
        seed(&f.storage, "stale").await;
        f.fetcher.respond(URL, Response::json("fresh"));

        let served = f.executor.stale_while_revalidate(&request()).await.unwrap().unwrap();
        assert_eq!(served.response.text().unwrap(), "stale");

        f.executor.revalidator().settle().await;
        assert_eq!(stored_body(&f.storage).await.as_deref(), Some("fresh"));
        assert_eq!(f.fetcher.calls_to(URL), 1);
    }

    #[tokio::test]
    async fn test_swr_miss_awaits_network() {
        let f = fixture();
        f.fetcher.respond(URL, Response::json("fresh"));

        let served = f.executor.stale_while_revalidate(&request()).await.unwrap().unwrap();
        assert_eq!(served.source, ServedFrom::Network);
        assert_eq!(served.response.text().unwrap(), "fresh");
        assert_eq!(stored_body(&f.storage).await.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_swr_miss_unreachable_is_no_result() {
        let f = fixture();
        f.fetcher.set_offline(true);
        assert!(f.executor.stale_while_revalidate(&request()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_swr_hit_survives_failed_refresh() {
        let f = fixture();
        seed(&f.storage, "stale").await;
        f.fetcher.set_offline(true);

        let served = f.executor.stale_while_revalidate(&request()).await.unwrap().unwrap();
        assert_eq!(served.response.text().unwrap(), "stale");
        f.executor.revalidator().settle().await;
        assert_eq!(stored_body(&f.storage).await.as_deref(), Some("stale"));
    }

    #[tokio::test]
    async fn test_swr_latest_issued_fetch_wins() {
        let f = fixture();
        seed(&f.storage, "seed").await;
        // The first refresh is slow and completes after the second.
        f.fetcher
            .respond_after(URL, Response::json("first"), Duration::from_millis(50))
            .respond(URL, Response::json("second"));

        f.executor.stale_while_revalidate(&request()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        f.executor.stale_while_revalidate(&request()).await.unwrap();
        f.executor.revalidator().settle().await;

        assert_eq!(stored_body(&f.storage).await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_run_dispatches_by_strategy() {
        let f = fixture();
        seed(&f.storage, "cached").await;
        f.fetcher.respond(URL, Response::json("fresh"));

        let served = f
            .executor
            .run(CachingStrategy::NetworkFirst, &request())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(served.source, ServedFrom::Network);
    }

    // === Concurrency Tests ===

    #[tokio::test]
    async fn test_slow_write_does_not_stall_other_keys() {
        const SLOW: &str = "https://app.example/slow.json";
        const FAST: &str = "https://app.example/fast.png";
        let (_, fetcher, executor) = gated(Puts::SlowFor("/slow.json"));
        fetcher.respond(SLOW, Response::json("slow"));
        fetcher.respond(FAST, Response::new(StatusCode::OK).with_body("png"));

        let slow = {
            let executor = Arc::clone(&executor);
            tokio::spawn(async move {
                let request = Request::get(Url::parse(SLOW).unwrap());
                executor.network_first(&request).await.unwrap()
            })
        };
        // Let the slow put start.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let started = Instant::now();
        let fast = Request::get(Url::parse(FAST).unwrap());
        let served = executor.cache_first(&fast).await.unwrap().unwrap();
        assert_eq!(served.source, ServedFrom::Network);
        assert!(started.elapsed() < Duration::from_millis(200));

        assert!(slow.await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_swr_store_failure_surfaces_to_waiting_caller() {
        let (storage, fetcher, executor) = gated(Puts::Fail);
        fetcher.respond(URL, Response::json("fresh"));

        let err = executor.stale_while_revalidate(&request()).await.unwrap_err();
        assert!(matches!(err, CacheError::Storage(_)));
        assert!(match_in(storage.as_ref(), RUNTIME, &request()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_swr_store_failure_after_caller_left() {
        let (storage, fetcher, executor) = gated(Puts::Fail);
        fetcher.respond_after(URL, Response::json("fresh"), Duration::from_millis(50));

        let abandoned =
            tokio::time::timeout(Duration::from_millis(5), executor.stale_while_revalidate(&request())).await;
        assert!(abandoned.is_err());

        assert_eq!(executor.revalidator().settle().await, 1);
        assert_eq!(fetcher.calls_to(URL), 1);
        assert!(match_in(storage.as_ref(), RUNTIME, &request()).await.unwrap().is_none());
    }
}
