//! Cache store primitive: named generations of request/response entries.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use offline_core::{Method, Request, Response};

use crate::key::RequestKey;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Only GET requests can be stored.
    #[error("cannot store a {0} request")]
    UnsupportedMethod(Method),

    /// Backend storage error.
    #[error("storage error: {0}")]
    Storage(String),
}

/// A response read back from a cache generation.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    /// Independent copy of the stored response.
    pub response: Response,
    /// When the entry was written.
    pub stored_at: DateTime<Utc>,
}

impl CachedResponse {
    /// Age of the entry.
    pub fn age(&self) -> Duration {
        (Utc::now() - self.stored_at).to_std().unwrap_or_default()
    }

    /// Take the response.
    pub fn into_response(self) -> Response {
        self.response
    }
}

/// Handle to one open cache generation.
#[async_trait]
pub trait CacheHandle: Send + Sync {
    /// Generation name.
    fn name(&self) -> &str;

    /// Look up the entry matching a request.
    async fn match_request(&self, request: &Request) -> CacheResult<Option<CachedResponse>>;

    /// Store a snapshot of `response` under the request's identity,
    /// replacing any previous entry.
    async fn put(&self, request: &Request, response: &Response) -> CacheResult<()>;

    /// Remove the entry for a request. Returns whether one existed.
    async fn delete(&self, request: &Request) -> CacheResult<bool>;

    /// Keys of all entries.
    async fn keys(&self) -> CacheResult<Vec<RequestKey>>;
}

/// Named cache generations.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a generation, creating it if it does not exist.
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn CacheHandle>>;

    /// Open a generation only if it already exists.
    async fn open_existing(&self, name: &str) -> CacheResult<Option<Arc<dyn CacheHandle>>>;

    /// Whether a generation exists.
    async fn has(&self, name: &str) -> CacheResult<bool>;

    /// Delete a generation. Returns whether it existed.
    async fn delete(&self, name: &str) -> CacheResult<bool>;

    /// Names of all generations, in creation order.
    async fn keys(&self) -> CacheResult<Vec<String>>;
}

/// Look up a request in a generation without creating the generation.
pub async fn match_in(
    storage: &dyn CacheStorage,
    name: &str,
    request: &Request,
) -> CacheResult<Option<CachedResponse>> {
    match storage.open_existing(name).await? {
        Some(cache) => cache.match_request(request).await,
        None => Ok(None),
    }
}
