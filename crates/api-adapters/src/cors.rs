//! Dynamic CORS policy: every request's `Origin` is checked against the
//! live allow-set built by [`OriginResolver`].

use std::sync::Arc;
use std::time::Duration;

use axum::http::request::Parts;
use axum::http::{header, HeaderValue, Method};
use services::OriginResolver;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::metrics::Metrics;

pub fn dynamic_cors(origins: Arc<OriginResolver>, metrics: Arc<Metrics>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::async_predicate(
            move |origin: HeaderValue, _parts: &Parts| async move {
                let allowed = match origin.to_str() {
                    Ok(origin) => origins.is_origin_allowed(origin).await,
                    Err(_) => false,
                };
                if !allowed {
                    metrics.cors_rejected();
                }
                allowed
            },
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ORIGIN,
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
