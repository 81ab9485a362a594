//! Core abstractions for the offline interception layer.
//!
//! This crate provides the fundamental types shared by every other crate:
//! - `Request` / `Response` - The intercepted request and its (snapshot) response
//! - `RequestClass` - Classification tag driving strategy selection
//! - `WorkerConfig` - Version tag, origin and fallback documents
//! - `PrecacheManifest` - Asset paths fetched at install time
//! - `WorkerState` - Install/activate lifecycle states

mod class;
mod config;
mod lifecycle;
mod manifest;
mod request;
mod response;

pub use class::*;
pub use config::*;
pub use lifecycle::*;
pub use manifest::*;
pub use request::*;
pub use response::*;

// Re-export the http primitives used in public signatures.
pub use http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
pub use url::Url;
