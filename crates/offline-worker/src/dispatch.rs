//! Request dispatch: classification, strategy, fallback.

use std::sync::Arc;

use offline_cache::{should_include_debug_headers, CacheError, CacheExplainHeaders, CacheStatus, CacheStorage};
use offline_core::{Method, Request, RequestClass, Response, Url, WorkerConfig};
use offline_fetch::Fetcher;
use offline_observability::{DispatchMetrics, Outcome};
use offline_strategy::{
    FallbackChain, FallbackResolver, FallbackResult, Revalidator, ServedFrom, StrategyExecutor,
};
use tracing::Instrument;

use crate::classifier::{classify, strategy_for};
use crate::error::{WorkerError, WorkerResult};

/// What the host should do with an intercepted request.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Not handled; the host performs the request itself.
    Passthrough,
    /// Reply with this response.
    Respond(Response),
    /// Fail the request as a network error.
    NetworkError,
}

impl Dispatch {
    /// The response, if one was produced.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Respond(response) => Some(response),
            _ => None,
        }
    }

    /// Take the response, if one was produced.
    pub fn into_response(self) -> Option<Response> {
        match self {
            Self::Respond(response) => Some(response),
            _ => None,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self, Self::Passthrough)
    }
}

/// Routes each intercepted request to a strategy and a fallback chain.
pub struct Dispatcher {
    origin: Url,
    executor: StrategyExecutor,
    fallback: FallbackResolver,
    navigation_chain: FallbackChain,
    debug_headers: bool,
    metrics: Arc<DispatchMetrics>,
}

impl Dispatcher {
    /// Create a dispatcher for `config`'s origin and generations.
    pub fn new(config: &WorkerConfig, storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>) -> Self {
        let generations = offline_cache::GenerationSet::for_version(&config.version);
        Self {
            origin: config.origin.clone(),
            executor: StrategyExecutor::new(storage.clone(), fetcher, generations.runtime.name()),
            fallback: FallbackResolver::new(
                storage,
                generations.static_assets.name(),
                config.origin.clone(),
                config.app_name.clone(),
            ),
            navigation_chain: FallbackChain::navigation(
                &config.root_document,
                config.offline_document.as_deref(),
            ),
            debug_headers: config.debug_headers,
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    /// Record into shared metrics.
    pub fn with_metrics(mut self, metrics: Arc<DispatchMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Dispatch counters.
    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    /// Background revalidation tracker.
    pub fn revalidator(&self) -> &Arc<Revalidator> {
        self.executor.revalidator()
    }

    /// Fallback chain tried when the strategy for `class` yields nothing.
    pub fn fallback_chain(&self, class: RequestClass) -> FallbackChain {
        match class {
            RequestClass::Navigation => self.navigation_chain.clone(),
            RequestClass::Json => FallbackChain::json(),
            RequestClass::Image | RequestClass::Generic => FallbackChain::asset(),
        }
    }

    /// Handle an intercepted request.
    ///
    /// Non-GET and cross-origin requests pass through without touching the
    /// cache store. Store failures are returned as errors.
    pub async fn handle(&self, request: &Request) -> WorkerResult<Dispatch> {
        if request.method != Method::GET {
            tracing::debug!(method = %request.method, url = %request.url, "passthrough: method");
            self.metrics.record_outcome(Outcome::Passthrough);
            return Ok(Dispatch::Passthrough);
        }
        if !request.is_same_origin(&self.origin) {
            tracing::debug!(url = %request.url, "passthrough: cross-origin");
            self.metrics.record_outcome(Outcome::Passthrough);
            return Ok(Dispatch::Passthrough);
        }

        let class = classify(request);
        self.metrics.record_class(class);

        let span = tracing::debug_span!(
            "dispatch",
            request_id = %request.id,
            class = %class,
            path = request.path(),
        );
        self.dispatch(class, request).instrument(span).await
    }

    async fn dispatch(&self, class: RequestClass, request: &Request) -> WorkerResult<Dispatch> {
        let strategy = strategy_for(class);
        let mut explain = CacheExplainHeaders::new().with_strategy(strategy.as_str());

        let served = self
            .executor
            .run(strategy, request)
            .await
            .map_err(|err| self.store_failed(err))?;

        let mut response = match served {
            Some(served) => {
                match served.source {
                    ServedFrom::Network => {
                        self.metrics.record_outcome(Outcome::Network);
                        explain = explain.with_status(CacheStatus::Miss);
                    }
                    ServedFrom::RuntimeCache => {
                        self.metrics.record_outcome(Outcome::RuntimeCache);
                        explain = explain
                            .with_status(CacheStatus::Hit)
                            .with_generation(self.executor.runtime());
                    }
                }
                if let Some(age) = served.age {
                    explain = explain.with_age(age);
                }
                tracing::debug!(strategy = %strategy, source = ?served.source, status = %served.response.status, "served");
                served.response
            }
            None => {
                let chain = self.fallback_chain(class);
                let fallback = self
                    .fallback
                    .apply(&chain, request)
                    .await
                    .map_err(|err| self.store_failed(err))?;

                match fallback {
                    FallbackResult::Cached(hit) => {
                        self.metrics.record_outcome(Outcome::StaticCache);
                        explain = explain
                            .with_status(CacheStatus::Fallback)
                            .with_generation(self.fallback.static_name())
                            .with_age(hit.age());
                        tracing::debug!(strategy = %strategy, "served static fallback");
                        hit.into_response()
                    }
                    FallbackResult::Synthesized(response) => {
                        self.metrics.record_outcome(Outcome::Synthesized);
                        explain = explain.with_status(CacheStatus::Offline);
                        tracing::debug!(strategy = %strategy, "served synthesized fallback");
                        response
                    }
                    FallbackResult::NetworkError => {
                        self.metrics.record_outcome(Outcome::NetworkError);
                        tracing::debug!(strategy = %strategy, "no response available");
                        return Ok(Dispatch::NetworkError);
                    }
                }
            }
        };

        if self.debug_headers || should_include_debug_headers(&request.headers) {
            explain.apply(&mut response);
        }
        Ok(Dispatch::Respond(response))
    }

    fn store_failed(&self, err: CacheError) -> WorkerError {
        self.metrics.record_store_error();
        tracing::warn!(error = %err, "cache store failure during dispatch");
        err.into()
    }
}
