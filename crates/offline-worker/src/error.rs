//! Worker error types.

use offline_cache::CacheError;
use offline_core::{ConfigError, WorkerState};

/// Result type for worker operations.
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Worker errors.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// Store failure; fatal to the operation that hit it.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Lifecycle event not allowed in the current state.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: WorkerState,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl WorkerError {
    /// Whether the error came from the cache store.
    pub fn is_cache_error(&self) -> bool {
        matches!(self, Self::Cache(_))
    }
}
