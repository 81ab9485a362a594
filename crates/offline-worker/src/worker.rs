//! Worker facade invoked by the host for each trigger event.

use std::sync::Arc;

use offline_cache::{CacheStorage, GenerationSet};
use offline_core::{Request, WorkerConfig, WorkerState};
use offline_fetch::Fetcher;
use offline_observability::{DispatchMetrics, MetricsSnapshot};

use crate::dispatch::{Dispatch, Dispatcher};
use crate::error::WorkerResult;
use crate::host::WorkerHost;
use crate::lifecycle::{ActivateReport, InstallReport, LifecycleManager};
use crate::message::ControlMessage;

/// One worker instance: lifecycle plus request dispatch for a version tag.
pub struct ServiceWorker {
    config: WorkerConfig,
    lifecycle: LifecycleManager,
    dispatcher: Dispatcher,
    host: Arc<dyn WorkerHost>,
    metrics: Arc<DispatchMetrics>,
}

impl ServiceWorker {
    /// Create a worker after validating `config`.
    pub fn new(
        config: WorkerConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        host: Arc<dyn WorkerHost>,
    ) -> WorkerResult<Self> {
        config.validate()?;

        let metrics = Arc::new(DispatchMetrics::new());
        let lifecycle = LifecycleManager::new(
            storage.clone(),
            fetcher.clone(),
            host.clone(),
            GenerationSet::for_version(&config.version),
            config.origin.clone(),
            config.precache.clone(),
        )
        .with_metrics(metrics.clone());
        let dispatcher = Dispatcher::new(&config, storage, fetcher).with_metrics(metrics.clone());

        tracing::debug!(version = %config.version, origin = %config.origin, "worker created");
        Ok(Self {
            config,
            lifecycle,
            dispatcher,
            host,
            metrics,
        })
    }

    /// Install event: populate the static generation.
    pub async fn on_install(&self) -> WorkerResult<InstallReport> {
        self.lifecycle.install().await
    }

    /// Activate event: purge stale generations and claim clients.
    pub async fn on_activate(&self) -> WorkerResult<ActivateReport> {
        self.lifecycle.activate().await
    }

    /// Fetch event.
    pub async fn handle(&self, request: &Request) -> WorkerResult<Dispatch> {
        self.dispatcher.handle(request).await
    }

    /// Message event. Returns the control message acted on, if any.
    pub async fn on_message(&self, message: &serde_json::Value) -> Option<ControlMessage> {
        let Some(control) = ControlMessage::parse(message) else {
            tracing::debug!(%message, "ignoring unrecognized message");
            return None;
        };

        match control {
            ControlMessage::SkipWaiting => {
                tracing::info!("skip waiting requested");
                self.host.skip_waiting().await;
            }
        }
        Some(control)
    }

    /// Wait for outstanding background revalidations.
    pub async fn settle(&self) -> usize {
        self.dispatcher.revalidator().settle().await
    }

    pub fn state(&self) -> WorkerState {
        self.lifecycle.state()
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn generations(&self) -> &GenerationSet {
        self.lifecycle.generations()
    }

    /// Counters for dispatch and lifecycle work.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use offline_cache::MemoryCacheStorage;
    use offline_core::{ConfigError, Url};
    use offline_fetch::ScriptedFetcher;
    use serde_json::json;

    use super::*;
    use crate::error::WorkerError;
    use crate::host::RecordingHost;

    fn worker(config: WorkerConfig, host: Arc<RecordingHost>) -> WorkerResult<ServiceWorker> {
        ServiceWorker::new(
            config,
            Arc::new(MemoryCacheStorage::new()),
            Arc::new(ScriptedFetcher::new()),
            host,
        )
    }

    fn config() -> WorkerConfig {
        WorkerConfig::new("v1", Url::parse("https://app.example").unwrap())
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let err = worker(WorkerConfig::new("", Url::parse("https://app.example").unwrap()), Arc::new(RecordingHost::new()))
            .err()
            .unwrap();
        assert!(matches!(err, WorkerError::Config(ConfigError::EmptyVersion)));
    }

    #[tokio::test]
    async fn test_skip_waiting_message() {
        let host = Arc::new(RecordingHost::new());
        let worker = worker(config(), host.clone()).unwrap();

        let handled = worker.on_message(&json!({"type": "SKIP_WAITING"})).await;
        assert_eq!(handled, Some(ControlMessage::SkipWaiting));
        assert_eq!(host.skip_waiting_calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_message_ignored() {
        let host = Arc::new(RecordingHost::new());
        let worker = worker(config(), host.clone()).unwrap();

        assert_eq!(worker.on_message(&json!({"type": "PING"})).await, None);
        assert_eq!(host.skip_waiting_calls(), 0);
    }

    #[tokio::test]
    async fn test_generations_follow_version() {
        let worker = worker(config(), Arc::new(RecordingHost::new())).unwrap();
        assert_eq!(worker.generations().static_assets.name(), "static-v1");
        assert_eq!(worker.state(), WorkerState::Parsed);
    }
}
