//! Network fetch primitive.

use std::sync::Arc;

use async_trait::async_trait;
use offline_core::{Request, Response};

/// Error type for fetch operations.
///
/// A response with an error status is not a `FetchError`; the transport
/// reached the server and the response is returned as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request aborted")]
    Aborted,

    #[error("Request error: {0}")]
    InvalidRequest(String),
}

impl FetchError {
    /// Whether the network could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Aborted)
    }
}

/// The host's network transport.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Send a request and return whatever response the network produced.
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        (**self).fetch(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_classification() {
        assert!(FetchError::Connection("reset".into()).is_connectivity());
        assert!(FetchError::Aborted.is_connectivity());
        assert!(!FetchError::InvalidRequest("bad url".into()).is_connectivity());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            FetchError::Connection("dns".into()).to_string(),
            "Connection error: dns"
        );
    }
}
