//! # api-adapters
//!
//! HTTP surface of the comment backend. Request decoding and metrics are
//! framework independent; everything else lives behind `web-axum`.

pub mod metrics;
pub mod params;

#[cfg(feature = "web-axum")]
pub mod cors;
#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
pub mod routes;
#[cfg(feature = "web-axum")]
pub mod state;

pub use metrics::Metrics;
pub use params::{CacheFlushParams, CommentGetParams, SiteDeleteParams, SITE_ALL};

#[cfg(feature = "web-axum")]
pub use error::{ApiError, ApiResponse};
#[cfg(feature = "web-axum")]
pub use routes::router;
#[cfg(feature = "web-axum")]
pub use state::AppState;
