//! Request classification.

use offline_core::{Method, Request, RequestClass, RequestMode};
use offline_strategy::CachingStrategy;

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".webp", ".svg"];

/// Classify a request. The first matching rule wins.
pub fn classify(request: &Request) -> RequestClass {
    if request.mode == RequestMode::Navigate
        || (request.method == Method::GET && request.accepts_html())
    {
        return RequestClass::Navigation;
    }

    let path = request.path();
    if path.ends_with(".json") {
        return RequestClass::Json;
    }

    let lower = path.to_ascii_lowercase();
    if IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return RequestClass::Image;
    }

    RequestClass::Generic
}

/// Caching strategy used for a class.
pub fn strategy_for(class: RequestClass) -> CachingStrategy {
    match class {
        RequestClass::Navigation => CachingStrategy::NetworkFirst,
        RequestClass::Json => CachingStrategy::StaleWhileRevalidate,
        RequestClass::Image => CachingStrategy::CacheFirst,
        RequestClass::Generic => CachingStrategy::StaleWhileRevalidate,
    }
}
