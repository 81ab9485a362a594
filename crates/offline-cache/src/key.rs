//! Request identity for cache lookups.

use offline_core::{header, HeaderMap, Method, Request, Response, Url};
use serde::{Serialize, Serializer};

/// Identity of a cached request: method plus URL without fragment.
///
/// Headers named by a stored response's `Vary` header also take part in
/// matching; see [`vary_matches`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    method: Method,
    url: String,
}

impl RequestKey {
    /// Create a key from a method and URL.
    pub fn new(method: Method, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            method,
            url: url.into(),
        }
    }

    /// Key for a request.
    pub fn from_request(request: &Request) -> Self {
        Self::new(request.method.clone(), &request.url)
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The normalized URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

impl Serialize for RequestKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Check whether an incoming request matches a stored entry under the stored
/// response's `Vary` header.
///
/// `Vary: *` never matches. An unreadable `Vary` value never matches.
pub fn vary_matches(response: &Response, stored: &HeaderMap, incoming: &HeaderMap) -> bool {
    for value in response.headers.get_all(header::VARY) {
        let Ok(value) = value.to_str() else {
            return false;
        };

        for name in value.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if name == "*" {
                return false;
            }
            if !stored.get_all(name).iter().eq(incoming.get_all(name).iter()) {
                return false;
            }
        }
    }
    true
}
