//! Request classification tags.

use serde::{Deserialize, Serialize};

/// Shape of an intercepted request, used to pick a caching strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestClass {
    /// Top-level document load.
    Navigation,
    /// `.json` resource.
    Json,
    /// Raster or vector image.
    Image,
    /// Anything else.
    Generic,
}

impl RequestClass {
    /// All classes, in classification priority order.
    pub const ALL: [RequestClass; 4] = [Self::Navigation, Self::Json, Self::Image, Self::Generic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigation => "navigation",
            Self::Json => "json",
            Self::Image => "image",
            Self::Generic => "generic",
        }
    }
}

impl std::fmt::Display for RequestClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
