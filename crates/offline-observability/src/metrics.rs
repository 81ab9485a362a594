//! Dispatch and lifecycle counters.

use std::sync::atomic::{AtomicU64, Ordering};

use offline_core::RequestClass;
use serde::{Deserialize, Serialize};

/// Where a dispatched response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Fresh network response.
    Network,
    /// Runtime generation entry.
    RuntimeCache,
    /// Static generation entry reached through a fallback chain.
    StaticCache,
    /// Locally generated offline page or empty JSON.
    Synthesized,
    /// Nothing could be served.
    NetworkError,
    /// Left to the host.
    Passthrough,
}

#[derive(Debug, Default)]
struct ClassCounters {
    navigation: AtomicU64,
    json: AtomicU64,
    image: AtomicU64,
    generic: AtomicU64,
}

#[derive(Debug, Default)]
struct OutcomeCounters {
    network: AtomicU64,
    runtime_cache: AtomicU64,
    static_cache: AtomicU64,
    synthesized: AtomicU64,
    network_error: AtomicU64,
    passthrough: AtomicU64,
}

/// Counters for dispatch decisions and lifecycle work.
///
/// Shared by reference; every method takes `&self`.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    classes: ClassCounters,
    outcomes: OutcomeCounters,
    store_errors: AtomicU64,
    precache_fetched: AtomicU64,
    precache_failed: AtomicU64,
    generations_purged: AtomicU64,
}

impl DispatchMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a classified request.
    pub fn record_class(&self, class: RequestClass) {
        let counter = match class {
            RequestClass::Navigation => &self.classes.navigation,
            RequestClass::Json => &self.classes.json,
            RequestClass::Image => &self.classes.image,
            RequestClass::Generic => &self.classes.generic,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a dispatch outcome.
    pub fn record_outcome(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Network => &self.outcomes.network,
            Outcome::RuntimeCache => &self.outcomes.runtime_cache,
            Outcome::StaticCache => &self.outcomes.static_cache,
            Outcome::Synthesized => &self.outcomes.synthesized,
            Outcome::NetworkError => &self.outcomes.network_error,
            Outcome::Passthrough => &self.outcomes.passthrough,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a store failure that aborted a dispatch or lifecycle step.
    pub fn record_store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the result of a precache run.
    pub fn record_precache(&self, fetched: u64, failed: u64) {
        self.precache_fetched.fetch_add(fetched, Ordering::Relaxed);
        self.precache_failed.fetch_add(failed, Ordering::Relaxed);
    }

    /// Record generations deleted at activation.
    pub fn record_purged(&self, count: u64) {
        self.generations_purged.fetch_add(count, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            requests: ClassCounts {
                navigation: load(&self.classes.navigation),
                json: load(&self.classes.json),
                image: load(&self.classes.image),
                generic: load(&self.classes.generic),
            },
            outcomes: OutcomeCounts {
                network: load(&self.outcomes.network),
                runtime_cache: load(&self.outcomes.runtime_cache),
                static_cache: load(&self.outcomes.static_cache),
                synthesized: load(&self.outcomes.synthesized),
                network_error: load(&self.outcomes.network_error),
                passthrough: load(&self.outcomes.passthrough),
            },
            store_errors: load(&self.store_errors),
            precache_fetched: load(&self.precache_fetched),
            precache_failed: load(&self.precache_failed),
            generations_purged: load(&self.generations_purged),
        }
    }
}

/// Requests per class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub navigation: u64,
    pub json: u64,
    pub image: u64,
    pub generic: u64,
}

impl ClassCounts {
    pub fn get(&self, class: RequestClass) -> u64 {
        match class {
            RequestClass::Navigation => self.navigation,
            RequestClass::Json => self.json,
            RequestClass::Image => self.image,
            RequestClass::Generic => self.generic,
        }
    }

    pub fn total(&self) -> u64 {
        self.navigation + self.json + self.image + self.generic
    }
}

/// Responses per outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub network: u64,
    pub runtime_cache: u64,
    pub static_cache: u64,
    pub synthesized: u64,
    pub network_error: u64,
    pub passthrough: u64,
}

impl OutcomeCounts {
    pub fn get(&self, outcome: Outcome) -> u64 {
        match outcome {
            Outcome::Network => self.network,
            Outcome::RuntimeCache => self.runtime_cache,
            Outcome::StaticCache => self.static_cache,
            Outcome::Synthesized => self.synthesized,
            Outcome::NetworkError => self.network_error,
            Outcome::Passthrough => self.passthrough,
        }
    }
}

/// Serializable copy of [`DispatchMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub requests: ClassCounts,
    pub outcomes: OutcomeCounts,
    pub store_errors: u64,
    pub precache_fetched: u64,
    pub precache_failed: u64,
    pub generations_purged: u64,
}

impl MetricsSnapshot {
    /// Cache hit ratio over handled requests (runtime and static hits).
    pub fn hit_ratio(&self) -> f64 {
        let handled = self.requests.total();
        if handled == 0 {
            return 0.0;
        }
        (self.outcomes.runtime_cache + self.outcomes.static_cache) as f64 / handled as f64
    }

    /// Export as JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Export as pretty JSON.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Human-readable summary.
    pub fn to_summary(&self) -> String {
        let mut lines = vec![format!(
            "Requests: {} (navigation {}, json {}, image {}, generic {})",
            self.requests.total(),
            self.requests.navigation,
            self.requests.json,
            self.requests.image,
            self.requests.generic,
        )];

        lines.push(format!(
            "Outcomes: network {}, runtime {}, static {}, synthesized {}, error {}, passthrough {}",
            self.outcomes.network,
            self.outcomes.runtime_cache,
            self.outcomes.static_cache,
            self.outcomes.synthesized,
            self.outcomes.network_error,
            self.outcomes.passthrough,
        ));

        lines.push(format!("Hit ratio: {:.1}%", self.hit_ratio() * 100.0));

        if self.store_errors > 0 {
            lines.push(format!("Store errors: {}", self.store_errors));
        }

        lines.push(format!(
            "Precache: {} fetched, {} failed; {} generations purged",
            self.precache_fetched, self.precache_failed, self.generations_purged
        ));

        lines.join("\n")
    }
}
