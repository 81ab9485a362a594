//! Cache generation lifecycle: install and activate.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use offline_cache::{CacheHandle, CacheResult, CacheStorage, GenerationSet};
use offline_core::{CacheMode, PrecacheManifest, Request, Url, WorkerState};
use offline_fetch::Fetcher;
use offline_observability::DispatchMetrics;
use serde::Serialize;

use crate::error::{WorkerError, WorkerResult};
use crate::host::WorkerHost;

/// Outcome of an install.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    /// Static generation that was populated.
    pub generation: String,
    /// Paths stored in the static generation.
    pub cached: Vec<String>,
    /// Paths that could not be fetched or returned an error status.
    pub failed: Vec<String>,
}

/// Outcome of an activation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    /// Generations deleted, in enumeration order.
    pub deleted: Vec<String>,
}

enum AssetResult {
    Cached,
    Failed,
}

/// Installs the static generation and retires stale generations.
pub struct LifecycleManager {
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    host: Arc<dyn WorkerHost>,
    generations: GenerationSet,
    origin: Url,
    manifest: PrecacheManifest,
    metrics: Arc<DispatchMetrics>,
    state: Mutex<WorkerState>,
}

impl LifecycleManager {
    /// Create a manager in the `Parsed` state.
    pub fn new(
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        host: Arc<dyn WorkerHost>,
        generations: GenerationSet,
        origin: Url,
        manifest: PrecacheManifest,
    ) -> Self {
        Self {
            storage,
            fetcher,
            host,
            generations,
            origin,
            manifest,
            metrics: Arc::new(DispatchMetrics::new()),
            state: Mutex::new(WorkerState::Parsed),
        }
    }

    /// Record precache and purge counts into shared metrics.
    pub fn with_metrics(mut self, metrics: Arc<DispatchMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        *lock(&self.state)
    }

    /// Current generation names.
    pub fn generations(&self) -> &GenerationSet {
        &self.generations
    }

    /// Populate the static generation from the precache manifest.
    ///
    /// Each asset is fetched independently; a failed asset is logged and
    /// skipped. Only store failures fail the install, leaving the worker
    /// redundant. On success the host is asked to skip waiting.
    pub async fn install(&self) -> WorkerResult<InstallReport> {
        self.transition("install", WorkerState::Installing)?;

        match self.precache().await {
            Ok(report) => {
                self.metrics
                    .record_precache(report.cached.len() as u64, report.failed.len() as u64);
                tracing::info!(
                    generation = %report.generation,
                    cached = report.cached.len(),
                    failed = report.failed.len(),
                    "precache complete"
                );
                self.transition("install", WorkerState::Installed)?;
                self.host.skip_waiting().await;
                Ok(report)
            }
            Err(err) => {
                self.metrics.record_store_error();
                tracing::warn!(error = %err, "install failed");
                self.transition("install", WorkerState::Redundant)?;
                Err(err.into())
            }
        }
    }

    /// Delete every generation that is not current, then claim clients.
    pub async fn activate(&self) -> WorkerResult<ActivateReport> {
        self.transition("activate", WorkerState::Activating)?;

        match self.purge().await {
            Ok(report) => {
                self.metrics.record_purged(report.deleted.len() as u64);
                self.transition("activate", WorkerState::Activated)?;
                self.host.claim_clients().await;
                Ok(report)
            }
            Err(err) => {
                self.metrics.record_store_error();
                tracing::warn!(error = %err, "activation failed");
                self.transition("activate", WorkerState::Redundant)?;
                Err(err.into())
            }
        }
    }

    async fn precache(&self) -> CacheResult<InstallReport> {
        let generation = self.generations.static_assets.name();
        let cache = self.storage.open(&generation).await?;

        let paths = self.manifest.unique_paths();
        let results = join_all(paths.iter().map(|path| self.precache_one(cache.as_ref(), path))).await;

        let mut report = InstallReport {
            generation,
            ..InstallReport::default()
        };
        for (path, result) in paths.into_iter().zip(results) {
            match result? {
                AssetResult::Cached => report.cached.push(path.to_string()),
                AssetResult::Failed => report.failed.push(path.to_string()),
            }
        }
        Ok(report)
    }

    async fn precache_one(&self, cache: &dyn CacheHandle, path: &str) -> CacheResult<AssetResult> {
        let url = match PrecacheManifest::resolve(&self.origin, path) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(path, error = %err, "skipping unresolvable precache path");
                return Ok(AssetResult::Failed);
            }
        };

        let request = Request::get(url).with_cache_mode(CacheMode::Reload);
        match self.fetcher.fetch(&request).await {
            Ok(response) if response.is_success() => {
                cache.put(&request, &response).await?;
                tracing::debug!(path, "precached");
                Ok(AssetResult::Cached)
            }
            Ok(response) => {
                tracing::warn!(path, status = %response.status, "precache fetch returned error status");
                Ok(AssetResult::Failed)
            }
            Err(err) => {
                tracing::warn!(path, error = %err, "precache fetch failed");
                Ok(AssetResult::Failed)
            }
        }
    }

    async fn purge(&self) -> CacheResult<ActivateReport> {
        let existing = self.storage.keys().await?;
        let mut report = ActivateReport::default();

        for name in self.generations.stale(&existing) {
            if self.storage.delete(name).await? {
                tracing::info!(generation = name, "deleted stale generation");
                report.deleted.push(name.to_string());
            }
        }
        Ok(report)
    }

    fn transition(&self, operation: &'static str, next: WorkerState) -> WorkerResult<()> {
        let mut state = lock(&self.state);
        let from = *state;
        *state = from
            .transition(next)
            .map_err(|_| WorkerError::InvalidState { operation, state: from })?;
        tracing::info!(from = %from, to = %next, "lifecycle transition");
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
