//! Worker configuration.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::manifest::PrecacheManifest;

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("version tag must not be empty")]
    EmptyVersion,

    #[error("version tag contains whitespace: {0:?}")]
    InvalidVersion(String),

    #[error("origin must use http or https: {0}")]
    UnsupportedScheme(String),

    #[error("origin must not carry a path, query or fragment: {0}")]
    OriginHasPath(String),

    #[error("document path must be absolute: {0}")]
    RelativeDocument(String),
}

/// Configuration for a worker instance.
///
/// Generation names are derived from `version`, so deploying a new version
/// tag is what retires the previous generations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Build version tag (e.g. "mygov-v1.0.0").
    pub version: String,
    /// The application's own origin. Requests to other origins pass through.
    pub origin: Url,
    /// Assets fetched into the static generation at install time.
    #[serde(default)]
    pub precache: PrecacheManifest,
    /// Static document served to navigations when the network is down.
    #[serde(default = "default_root_document")]
    pub root_document: String,
    /// Optional precached offline document tried after the root document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offline_document: Option<String>,
    /// Application name shown on the synthesized offline page.
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Always attach cache debug headers to responses.
    #[serde(default)]
    pub debug_headers: bool,
}

fn default_root_document() -> String {
    "/index.html".to_string()
}

fn default_app_name() -> String {
    "Application".to_string()
}

impl WorkerConfig {
    /// Create a configuration with default documents and manifest.
    pub fn new(version: impl Into<String>, origin: Url) -> Self {
        Self {
            version: version.into(),
            origin,
            precache: PrecacheManifest::default(),
            root_document: default_root_document(),
            offline_document: None,
            app_name: default_app_name(),
            debug_headers: false,
        }
    }

    /// Set the precache manifest.
    pub fn with_precache(mut self, manifest: PrecacheManifest) -> Self {
        self.precache = manifest;
        self
    }

    /// Set the root document path.
    pub fn with_root_document(mut self, path: impl Into<String>) -> Self {
        self.root_document = path.into();
        self
    }

    /// Set the precached offline document path.
    pub fn with_offline_document(mut self, path: impl Into<String>) -> Self {
        self.offline_document = Some(path.into());
        self
    }

    /// Set the application name.
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Enable or disable debug headers.
    pub fn with_debug_headers(mut self, enabled: bool) -> Self {
        self.debug_headers = enabled;
        self
    }

    /// Load config from a TOML or JSON file (chosen by extension).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?
        };

        config
            .validate()
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        Ok(config)
    }

    /// Check the configuration for values the worker cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.is_empty() {
            return Err(ConfigError::EmptyVersion);
        }
        if self.version.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidVersion(self.version.clone()));
        }

        if !matches!(self.origin.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(self.origin.to_string()));
        }
        if self.origin.path() != "/" || self.origin.query().is_some() || self.origin.fragment().is_some() {
            return Err(ConfigError::OriginHasPath(self.origin.to_string()));
        }

        for doc in std::iter::once(&self.root_document).chain(self.offline_document.as_ref()) {
            if !doc.starts_with('/') {
                return Err(ConfigError::RelativeDocument(doc.clone()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn origin() -> Url {
        Url::parse("https://app.example").unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::new("v1", origin());
        assert_eq!(config.root_document, "/index.html");
        assert_eq!(config.offline_document, None);
        assert_eq!(config.precache, PrecacheManifest::default());
        assert!(!config.debug_headers);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_version() {
        let config = WorkerConfig::new("", origin());
        assert_eq!(config.validate(), Err(ConfigError::EmptyVersion));
    }

    #[test]
    fn test_validate_rejects_whitespace_version() {
        let config = WorkerConfig::new("v 1", origin());
        assert!(matches!(config.validate(), Err(ConfigError::InvalidVersion(_))));
    }

    #[test]
    fn test_validate_rejects_origin_with_path() {
        let config = WorkerConfig::new("v1", Url::parse("https://app.example/app/").unwrap());
        assert!(matches!(config.validate(), Err(ConfigError::OriginHasPath(_))));
    }

    #[test]
    fn test_validate_rejects_non_http_origin() {
        let config = WorkerConfig::new("v1", Url::parse("file:///tmp/").unwrap());
        assert!(matches!(config.validate(), Err(ConfigError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_validate_rejects_relative_documents() {
        let config = WorkerConfig::new("v1", origin()).with_offline_document("offline.html");
        assert!(matches!(config.validate(), Err(ConfigError::RelativeDocument(_))));
    }

    #[test]
    fn test_load_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
version = "mygov-v1.0.0"
origin = "https://app.example"
precache = ["/", "/index.html"]
offline_document = "/offline.html"
"#
        )
        .unwrap();

        let config = WorkerConfig::load(file.path()).unwrap();
        assert_eq!(config.version, "mygov-v1.0.0");
        assert_eq!(config.precache.len(), 2);
        assert_eq!(config.offline_document.as_deref(), Some("/offline.html"));
        assert_eq!(config.app_name, "Application");
    }

    #[test]
    fn test_load_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"version": "v2", "origin": "http://localhost:8080", "debug_headers": true}}"#
        )
        .unwrap();

        let config = WorkerConfig::load(file.path()).unwrap();
        assert_eq!(config.version, "v2");
        assert!(config.debug_headers);
        assert_eq!(config.precache, PrecacheManifest::default());
    }

    #[test]
    fn test_load_invalid_config_fails() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, r#"version = """#).unwrap();
        writeln!(file, r#"origin = "https://app.example""#).unwrap();
        assert!(WorkerConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(WorkerConfig::load("/nonexistent/worker.toml").is_err());
    }
}
