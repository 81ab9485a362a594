//! Caching strategies for intercepted requests.
//!
//! This crate provides:
//! - `StrategyExecutor` - Cache-first, network-first and stale-while-revalidate
//! - `Revalidator` - Tracks background revalidation tasks
//! - `WriteSequencer` - Per-key ordering of runtime cache writes
//! - `FallbackChain` - What to serve when a strategy yields nothing

mod fallback;
mod revalidate;
mod sequencer;
mod strategy;

pub use fallback::*;
pub use revalidate::*;
pub use sequencer::*;
pub use strategy::*;
