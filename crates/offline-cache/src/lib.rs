//! Versioned cache generations for the offline interception layer.
//!
//! This crate provides:
//! - `CacheStorage` / `CacheHandle` - The cache store primitive (named generations of request/response entries)
//! - `MemoryCacheStorage` - In-process implementation with operation counters
//! - `Generation` / `GenerationSet` - `{kind}-{version}` generation naming
//! - `RequestKey` - Request identity used for lookups
//! - `CacheExplainHeaders` - Debug headers describing how a response was served
//!
//! # Example
//!
//! ```ignore
//! use offline_cache::{CacheStorage, GenerationSet, MemoryCacheStorage};
//!
//! let storage = MemoryCacheStorage::new();
//! let generations = GenerationSet::for_version("v1");
//!
//! let runtime = storage.open(&generations.runtime.name()).await?;
//! runtime.put(&request, &response).await?;
//! let cached = runtime.match_request(&request).await?;
//! ```

mod generation;
mod headers;
mod key;
mod memory;
mod store;

pub use generation::*;
pub use headers::*;
pub use key::*;
pub use memory::*;
pub use store::*;
