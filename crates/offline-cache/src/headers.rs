//! Cache debugging headers.

use std::time::Duration;

use offline_core::{HeaderMap, HeaderName, HeaderValue, Response};
use serde::{Deserialize, Serialize};

/// Header names for cache debugging.
pub mod header_names {
    /// Cache status header (HIT, MISS, FALLBACK, OFFLINE).
    pub const X_CACHE_STATUS: &str = "x-cache-status";
    /// Strategy that produced the response.
    pub const X_CACHE_STRATEGY: &str = "x-cache-strategy";
    /// Generation the response was read from.
    pub const X_CACHE_GENERATION: &str = "x-cache-generation";
    /// Cache age in seconds.
    pub const X_CACHE_AGE: &str = "x-cache-age";
    /// Request header enabling debug output.
    pub const X_DEBUG_CACHE: &str = "x-debug-cache";
}

/// How a response was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Served from the runtime generation.
    Hit,
    /// Served from the network.
    Miss,
    /// Served from the static generation after the strategy yielded nothing.
    Fallback,
    /// Synthesized locally.
    Offline,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hit => write!(f, "HIT"),
            Self::Miss => write!(f, "MISS"),
            Self::Fallback => write!(f, "FALLBACK"),
            Self::Offline => write!(f, "OFFLINE"),
        }
    }
}

/// Cache explain headers for debugging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheExplainHeaders {
    /// Overall cache status.
    pub status: Option<CacheStatus>,
    /// Strategy name.
    pub strategy: Option<String>,
    /// Generation name.
    pub generation: Option<String>,
    /// Age of cached response in seconds.
    pub age_secs: Option<u64>,
}

impl CacheExplainHeaders {
    /// Create new explain headers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set cache status.
    pub fn with_status(mut self, status: CacheStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Set strategy.
    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    /// Set generation.
    pub fn with_generation(mut self, generation: impl Into<String>) -> Self {
        self.generation = Some(generation.into());
        self
    }

    /// Set age.
    pub fn with_age(mut self, age: Duration) -> Self {
        self.age_secs = Some(age.as_secs());
        self
    }

    /// Convert to HTTP headers. Values that are not valid header text are skipped.
    pub fn to_headers(&self) -> Vec<(HeaderName, HeaderValue)> {
        let mut pairs: Vec<(&'static str, String)> = Vec::new();

        if let Some(status) = &self.status {
            pairs.push((header_names::X_CACHE_STATUS, status.to_string()));
        }
        if let Some(strategy) = &self.strategy {
            pairs.push((header_names::X_CACHE_STRATEGY, strategy.clone()));
        }
        if let Some(generation) = &self.generation {
            pairs.push((header_names::X_CACHE_GENERATION, generation.clone()));
        }
        if let Some(age) = self.age_secs {
            pairs.push((header_names::X_CACHE_AGE, age.to_string()));
        }

        pairs
            .into_iter()
            .filter_map(|(name, value)| {
                HeaderValue::try_from(value)
                    .ok()
                    .map(|value| (HeaderName::from_static(name), value))
            })
            .collect()
    }

    /// Attach the headers to a response.
    pub fn apply(&self, response: &mut Response) {
        for (name, value) in self.to_headers() {
            response.headers.insert(name, value);
        }
    }
}

/// Utility to check if debug headers were requested.
pub fn should_include_debug_headers(request_headers: &HeaderMap) -> bool {
    request_headers
        .get(header_names::X_DEBUG_CACHE)
        .is_some_and(|value| value.as_bytes() == b"1")
}
