//! Host integration.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

/// Operations the host environment performs on the worker's behalf.
#[async_trait]
pub trait WorkerHost: Send + Sync {
    /// Activate this instance without waiting for older instances to release.
    async fn skip_waiting(&self);

    /// Take control of every open client.
    async fn claim_clients(&self);
}

/// Host that ignores every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHost;

#[async_trait]
impl WorkerHost for NoopHost {
    async fn skip_waiting(&self) {}

    async fn claim_clients(&self) {}
}

/// Host that counts the requests it receives.
#[derive(Debug, Default)]
pub struct RecordingHost {
    skip_waiting: AtomicUsize,
    claims: AtomicUsize,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of skip-waiting requests.
    pub fn skip_waiting_calls(&self) -> usize {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Number of claim-clients requests.
    pub fn claim_calls(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkerHost for RecordingHost {
    async fn skip_waiting(&self) {
        self.skip_waiting.fetch_add(1, Ordering::SeqCst);
    }

    async fn claim_clients(&self) {
        self.claims.fetch_add(1, Ordering::SeqCst);
    }
}
