//! Precache manifest: the fixed list of assets fetched at install time.

use serde::{Deserialize, Serialize};
use url::Url;

/// Asset paths shipped with the application shell.
const DEFAULT_PRECACHE: &[&str] = &[
    "/",
    "/index.html",
    "/idcard.html",
    "/offline.html",
    "/manifest.webmanifest",
    "/identity.json",
    "/id_pic.png",
    "/signiture.png",
    "/icons/icon-192.png",
    "/icons/icon-512.png",
    "/icons/maskable-192.png",
    "/icons/maskable-512.png",
    "/icons/apple-touch-icon-180.png",
    "/icons/favicon-32.png",
    "/icons/favicon-16.png",
];

/// Ordered list of relative asset paths known at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrecacheManifest {
    paths: Vec<String>,
}

impl PrecacheManifest {
    /// Create a manifest from paths.
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an empty manifest.
    pub fn empty() -> Self {
        Self { paths: Vec::new() }
    }

    /// All paths, in declaration order.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Paths in declaration order with duplicates removed.
    pub fn unique_paths(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.paths
            .iter()
            .map(String::as_str)
            .filter(|p| seen.insert(*p))
            .collect()
    }

    /// Number of declared paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the manifest is empty.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Resolve a manifest path against the application origin.
    pub fn resolve(origin: &Url, path: &str) -> Result<Url, url::ParseError> {
        origin.join(path)
    }
}

impl Default for PrecacheManifest {
    fn default() -> Self {
        Self::new(DEFAULT_PRECACHE.iter().copied())
    }
}
