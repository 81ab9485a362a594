//! Observability for the offline interception layer.
//!
//! This crate provides:
//! - `init_tracing` - Installs the global `tracing` subscriber
//! - `LogFormat` - JSON or human-readable log output
//! - `DispatchMetrics` - Counters for dispatch decisions and lifecycle work

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;
