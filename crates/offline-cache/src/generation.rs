//! Cache generation naming.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of cache generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    /// Assets fetched at install time.
    Static,
    /// Responses stored opportunistically while serving requests.
    Runtime,
}

impl CacheKind {
    /// Name prefix used for generations of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Runtime => "runtime",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cache generation, named `{kind}-{version}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Generation {
    /// Generation kind.
    pub kind: CacheKind,
    /// Build version tag.
    pub version: String,
}

impl Generation {
    /// Create a generation.
    pub fn new(kind: CacheKind, version: impl Into<String>) -> Self {
        Self {
            kind,
            version: version.into(),
        }
    }

    /// Storage name of this generation.
    pub fn name(&self) -> String {
        format!("{}-{}", self.kind, self.version)
    }

    /// Parse a storage name back into a generation.
    ///
    /// Returns `None` for names this layer did not create.
    pub fn parse(name: &str) -> Option<Self> {
        let (kind, version) = name.split_once('-')?;
        let kind = match kind {
            "static" => CacheKind::Static,
            "runtime" => CacheKind::Runtime,
            _ => return None,
        };
        if version.is_empty() {
            return None;
        }
        Some(Self::new(kind, version))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind, self.version)
    }
}

/// The current static and runtime generations for one version tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSet {
    /// Current static generation.
    pub static_assets: Generation,
    /// Current runtime generation.
    pub runtime: Generation,
}

impl GenerationSet {
    /// Generations for a version tag.
    pub fn for_version(version: &str) -> Self {
        Self {
            static_assets: Generation::new(CacheKind::Static, version),
            runtime: Generation::new(CacheKind::Runtime, version),
        }
    }

    /// Current generation of a kind.
    pub fn get(&self, kind: CacheKind) -> &Generation {
        match kind {
            CacheKind::Static => &self.static_assets,
            CacheKind::Runtime => &self.runtime,
        }
    }

    /// Whether `name` is exactly one of the current generation names.
    pub fn is_current(&self, name: &str) -> bool {
        name == self.static_assets.name() || name == self.runtime.name()
    }

    /// Names from `existing` that are not current, in input order.
    pub fn stale<'a>(&self, existing: &'a [String]) -> Vec<&'a str> {
        existing
            .iter()
            .map(String::as_str)
            .filter(|name| !self.is_current(name))
            .collect()
    }
}
