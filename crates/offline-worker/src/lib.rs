//! Offline request interception for a single-origin web application.
//!
//! This crate ties the layers together:
//! - `classify` - Maps a request to navigation, json, image or generic
//! - `Dispatcher` - Picks a caching strategy and fallback chain per request
//! - `LifecycleManager` - Installs the static generation and purges stale ones
//! - `ServiceWorker` - Facade invoked by the host for each trigger event
//!
//! ```ignore
//! use std::sync::Arc;
//! use offline_worker::prelude::*;
//!
//! let config = WorkerConfig::load("worker.toml")?;
//! let worker = ServiceWorker::new(config, storage, fetcher, Arc::new(NoopHost))?;
//!
//! worker.on_install().await?;
//! worker.on_activate().await?;
//!
//! match worker.handle(&request).await? {
//!     Dispatch::Respond(response) => reply(response),
//!     Dispatch::Passthrough => forward(request),
//!     Dispatch::NetworkError => fail(),
//! }
//! ```

mod classifier;
mod dispatch;
mod error;
mod host;
mod lifecycle;
mod message;
mod worker;

pub use classifier::*;
pub use dispatch::*;
pub use error::*;
pub use host::*;
pub use lifecycle::*;
pub use message::*;
pub use worker::*;

pub use offline_cache;
pub use offline_core;
pub use offline_fetch;
pub use offline_observability;
pub use offline_strategy;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        classify, strategy_for, ActivateReport, ControlMessage, Dispatch, Dispatcher,
        InstallReport, LifecycleManager, NoopHost, RecordingHost, ServiceWorker, WorkerError,
        WorkerHost, WorkerResult,
    };
    pub use offline_cache::{CacheHandle, CacheStorage, GenerationSet, MemoryCacheStorage};
    pub use offline_core::*;
    pub use offline_fetch::{FetchError, Fetcher};
    pub use offline_observability::{init_tracing, LogFormat, MetricsSnapshot};
    pub use offline_strategy::CachingStrategy;
}
