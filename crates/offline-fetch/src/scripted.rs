//! Scripted transport for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use offline_core::{CacheMode, Request, Response};

use crate::client::{FetchError, Fetcher};

#[derive(Debug, Clone)]
struct Step {
    outcome: Result<Response, FetchError>,
    delay: Option<Duration>,
}

/// A request seen by [`ScriptedFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Requested URL.
    pub url: String,
    /// Cache mode the request carried.
    pub cache: CacheMode,
}

/// Fetcher that replays scripted outcomes per URL.
///
/// Each URL holds a queue of outcomes; every fetch takes the next one, and the
/// last outcome repeats once the queue is down to one entry. URLs with no
/// script fail with a connection error, as does every fetch while offline.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    routes: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<Vec<RecordedCall>>,
    offline: AtomicBool,
}

impl ScriptedFetcher {
    /// Create a fetcher with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `url`.
    pub fn respond(&self, url: &str, response: Response) -> &Self {
        self.push(url, Ok(response), None)
    }

    /// Queue a response for `url` that arrives after `delay`.
    pub fn respond_after(&self, url: &str, response: Response, delay: Duration) -> &Self {
        self.push(url, Ok(response), Some(delay))
    }

    /// Queue a transport failure for `url`.
    pub fn fail(&self, url: &str, error: FetchError) -> &Self {
        self.push(url, Err(error), None)
    }

    /// Make every fetch fail with a connection error, or undo it.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of fetches issued for `url`.
    pub fn calls_to(&self, url: &str) -> usize {
        lock(&self.calls).iter().filter(|c| c.url == url).count()
    }

    /// Number of fetches issued in total.
    pub fn total_calls(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Every fetch issued, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    fn push(&self, url: &str, outcome: Result<Response, FetchError>, delay: Option<Duration>) -> &Self {
        lock(&self.routes)
            .entry(url.to_string())
            .or_default()
            .push_back(Step { outcome, delay });
        self
    }

    fn next_step(&self, url: &str) -> Option<Step> {
        let mut routes = lock(&self.routes);
        let queue = routes.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let url = request.url.as_str().to_string();
        lock(&self.calls).push(RecordedCall {
            url: url.clone(),
            cache: request.cache,
        });

        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Connection("offline".to_string()));
        }

        let Some(step) = self.next_step(&url) else {
            return Err(FetchError::Connection(format!("no route for {url}")));
        };

        if let Some(delay) = step.delay {
            tokio::time::sleep(delay).await;
        }
        step.outcome
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
