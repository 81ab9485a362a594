//! Fallback chains for requests a strategy could not serve.

use std::sync::Arc;

use offline_cache::{match_in, CacheResult, CacheStorage, CachedResponse};
use offline_core::{header, HeaderValue, PrecacheManifest, Request, Response, StatusCode, Url};

/// One step of a fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackStep {
    /// The static generation's entry for the request itself.
    StaticMatch,

    /// The static generation's entry for a fixed document path.
    StaticDocument(String),

    /// Synthesized offline page.
    OfflinePage,

    /// Synthesized empty JSON object.
    EmptyJson,

    /// Give up with a network error.
    NetworkError,
}

/// Ordered fallback steps, tried until one produces a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackChain {
    steps: Vec<FallbackStep>,
}

impl FallbackChain {
    /// Create a chain from explicit steps.
    pub fn new(steps: Vec<FallbackStep>) -> Self {
        Self { steps }
    }

    /// Navigation chain: root document, optional offline document, offline page.
    pub fn navigation(root_document: &str, offline_document: Option<&str>) -> Self {
        let mut steps = vec![FallbackStep::StaticDocument(root_document.to_string())];
        if let Some(doc) = offline_document {
            steps.push(FallbackStep::StaticDocument(doc.to_string()));
        }
        steps.push(FallbackStep::OfflinePage);
        Self { steps }
    }

    /// JSON chain: static entry, then `{}`.
    pub fn json() -> Self {
        Self::new(vec![FallbackStep::StaticMatch, FallbackStep::EmptyJson])
    }

    /// Asset chain: static entry, then a network error.
    pub fn asset() -> Self {
        Self::new(vec![FallbackStep::StaticMatch, FallbackStep::NetworkError])
    }

    /// Steps in order.
    pub fn steps(&self) -> &[FallbackStep] {
        &self.steps
    }
}

/// Result of walking a fallback chain.
#[derive(Debug, Clone)]
pub enum FallbackResult {
    /// Served from the static generation.
    Cached(CachedResponse),
    /// Generated locally.
    Synthesized(Response),
    /// No fallback produced a response.
    NetworkError,
}

/// Walks fallback chains against the static generation.
pub struct FallbackResolver {
    storage: Arc<dyn CacheStorage>,
    static_name: String,
    origin: Url,
    app_name: String,
}

impl FallbackResolver {
    /// Create a resolver reading from the static generation `static_name`.
    pub fn new(
        storage: Arc<dyn CacheStorage>,
        static_name: impl Into<String>,
        origin: Url,
        app_name: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            static_name: static_name.into(),
            origin,
            app_name: app_name.into(),
        }
    }

    /// Static generation name.
    pub fn static_name(&self) -> &str {
        &self.static_name
    }

    /// Try each step of `chain` in order.
    ///
    /// A chain that runs out of steps ends in a network error.
    pub async fn apply(&self, chain: &FallbackChain, request: &Request) -> CacheResult<FallbackResult> {
        for step in chain.steps() {
            match step {
                FallbackStep::StaticMatch => {
                    if let Some(hit) = self.lookup(request).await? {
                        return Ok(FallbackResult::Cached(hit));
                    }
                }
                FallbackStep::StaticDocument(path) => {
                    let Ok(url) = PrecacheManifest::resolve(&self.origin, path) else {
                        tracing::warn!(path = %path, "unresolvable fallback document");
                        continue;
                    };
                    if let Some(hit) = self.lookup(&Request::get(url)).await? {
                        return Ok(FallbackResult::Cached(hit));
                    }
                }
                FallbackStep::OfflinePage => {
                    return Ok(FallbackResult::Synthesized(offline_page(&self.app_name)));
                }
                FallbackStep::EmptyJson => {
                    return Ok(FallbackResult::Synthesized(empty_json()));
                }
                FallbackStep::NetworkError => return Ok(FallbackResult::NetworkError),
            }
        }
        Ok(FallbackResult::NetworkError)
    }

    async fn lookup(&self, request: &Request) -> CacheResult<Option<CachedResponse>> {
        match_in(self.storage.as_ref(), &self.static_name, request).await
    }
}

/// Locally generated page shown when a navigation cannot be served.
pub fn offline_page(app_name: &str) -> Response {
    let name = html_escape(app_name);
    let body = format!(
        concat!(
            "<!DOCTYPE html>\n",
            "<html lang=\"en\">\n",
            "<head><meta charset=\"utf-8\">",
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">",
            "<title>{name} - Offline</title></head>\n",
            "<body><main><h1>You are offline</h1>",
            "<p>{name} could not reach the network. Check your connection and try again.</p>",
            "</main></body>\n",
            "</html>\n"
        ),
        name = name
    );

    Response::html(body)
        .with_status(StatusCode::SERVICE_UNAVAILABLE)
        .with_header(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))
}

/// Locally generated empty JSON object.
pub fn empty_json() -> Response {
    Response::json("{}").with_header(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))
}

/// Simple HTML escape for text interpolated into the offline page.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use offline_cache::MemoryCacheStorage;

    use super::*;

    const STATIC: &str = "static-v1";

    fn origin() -> Url {
        Url::parse("https://app.example").unwrap()
    }

    fn get(path: &str) -> Request {
        Request::get(origin().join(path).unwrap())
    }

    async fn resolver_with(entries: &[(&str, &'static str)]) -> FallbackResolver {
        let storage = Arc::new(MemoryCacheStorage::new());
        let cache = storage.open(STATIC).await.unwrap();
        for (path, body) in entries {
            cache.put(&get(path), &Response::html(*body)).await.unwrap();
        }
        FallbackResolver::new(storage, STATIC, origin(), "My <App>")
    }

    // === Chain Tests ===

    #[test]
    fn test_navigation_chain_steps() {
        let chain = FallbackChain::navigation("/index.html", Some("/offline.html"));
        assert_eq!(
            chain.steps(),
            &[
                FallbackStep::StaticDocument("/index.html".into()),
                FallbackStep::StaticDocument("/offline.html".into()),
                FallbackStep::OfflinePage,
            ]
        );
        assert_eq!(FallbackChain::navigation("/index.html", None).steps().len(), 2);
    }

    #[tokio::test]
    async fn test_navigation_uses_root_document() {
        let resolver = resolver_with(&[("/index.html", "shell")]).await;
        let chain = FallbackChain::navigation("/index.html", None);

        match resolver.apply(&chain, &get("/account/settings")).await.unwrap() {
            FallbackResult::Cached(hit) => assert_eq!(hit.response.text().unwrap(), "shell"),
            other => panic!("expected cached shell, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_navigation_offline_document_before_synthesized() {
        let resolver = resolver_with(&[("/offline.html", "offline doc")]).await;
        let chain = FallbackChain::navigation("/index.html", Some("/offline.html"));

        match resolver.apply(&chain, &get("/")).await.unwrap() {
            FallbackResult::Cached(hit) => assert_eq!(hit.response.text().unwrap(), "offline doc"),
            other => panic!("expected offline document, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_navigation_synthesizes_offline_page() {
        let resolver = resolver_with(&[]).await;
        let chain = FallbackChain::navigation("/index.html", None);

        match resolver.apply(&chain, &get("/")).await.unwrap() {
            FallbackResult::Synthesized(page) => {
                assert_eq!(page.status, StatusCode::SERVICE_UNAVAILABLE);
                assert!(page.text().unwrap().contains("My &lt;App&gt;"));
            }
            other => panic!("expected offline page, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_json_chain() {
        let resolver = resolver_with(&[("/manifest.json", "{\"name\":\"app\"}")]).await;

        match resolver.apply(&FallbackChain::json(), &get("/manifest.json")).await.unwrap() {
            FallbackResult::Cached(_) => {}
            other => panic!("expected static entry, got {other:?}"),
        }
        match resolver.apply(&FallbackChain::json(), &get("/data.json")).await.unwrap() {
            FallbackResult::Synthesized(body) => assert_eq!(body.text().unwrap(), "{}"),
            other => panic!("expected empty json, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_asset_chain_ends_in_network_error() {
        let resolver = resolver_with(&[]).await;
        let result = resolver.apply(&FallbackChain::asset(), &get("/logo.png")).await.unwrap();
        assert!(matches!(result, FallbackResult::NetworkError));
    }

    #[tokio::test]
    async fn test_missing_static_generation_is_a_miss() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let resolver = FallbackResolver::new(storage.clone(), STATIC, origin(), "App");
        let result = resolver.apply(&FallbackChain::asset(), &get("/a.css")).await.unwrap();
        assert!(matches!(result, FallbackResult::NetworkError));
        assert!(!storage.has(STATIC).await.unwrap());
    }

    // === Synthesized Response Tests ===

    #[test]
    fn test_empty_json() {
        let response = empty_json();
        assert!(response.is_success());
        assert_eq!(response.content_type(), Some("application/json"));
        assert_eq!(response.json_body::<serde_json::Value>().unwrap(), serde_json::json!({}));
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape(r#"<a href="x">&</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }
}
