// CORS policy for the local API.
//
// The API is called from pages served by the content site, so the default is
// fully open. A configured list restricts it to exactly those origins.

use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Build a [`CorsLayer`] from the configured origin list.
///
/// - Empty list or any entry equal to `"*"`: allow any origin.
/// - Otherwise: allow exactly the listed origins.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    if origins.is_empty() || origins.iter().any(|origin| origin.trim() == "*") {
        base.allow_origin(AllowOrigin::any())
    } else {
        base.allow_origin(parse_origins(origins))
    }
}

fn parse_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| HeaderValue::from_str(s).ok())
        .collect()
}
