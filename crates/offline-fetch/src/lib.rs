//! Network fetch primitive.
//!
//! This crate provides:
//! - `Fetcher` - The host's network transport, behind a trait
//! - `FetchError` - Connectivity failures, distinct from HTTP error statuses
//! - `ScriptedFetcher` - Scripted transport for tests (`testing` feature)

mod client;
#[cfg(any(test, feature = "testing"))]
mod scripted;

pub use client::*;
#[cfg(any(test, feature = "testing"))]
pub use scripted::*;
