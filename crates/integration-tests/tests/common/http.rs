//! Router harness for the HTTP tests.

use std::sync::Arc;

use api_adapters::{router, AppState, Metrics};
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use domains::{AdminVerifier, CacheControl, EntityStore, MockAdminVerifier};
use serde_json::Value;
use services::{
    AdminService, CommentListSettings, CommentService, IpRegionEnricher, OriginResolver,
};
use storage_adapters::{CachedStore, MemoryStore};

pub const ADMIN_TOKEN: &str = "let-me-in";
pub const TRUSTED: &str = "https://a.com";

pub fn mock_verifier() -> Arc<dyn AdminVerifier> {
    let mut verifier = MockAdminVerifier::new();
    verifier
        .expect_verify_admin_token()
        .returning(|token| token == ADMIN_TOKEN);
    Arc::new(verifier)
}

pub struct TestApp {
    pub router: Router,
    pub metrics: Arc<Metrics>,
}

pub fn app(store: Arc<MemoryStore>) -> TestApp {
    app_with(store, mock_verifier(), true)
}

pub fn app_with(store: Arc<MemoryStore>, auth: Arc<dyn AdminVerifier>, cache: bool) -> TestApp {
    let backing: Arc<dyn EntityStore> = store;
    let (entities, cache): (Arc<dyn EntityStore>, Option<Arc<dyn CacheControl>>) = if cache {
        let cached = Arc::new(CachedStore::new(backing));
        let entities: Arc<dyn EntityStore> = cached.clone();
        let control: Arc<dyn CacheControl> = cached;
        (entities, Some(control))
    } else {
        (backing, None)
    };

    let mut public_conf = serde_json::Map::new();
    public_conf.insert("locale".into(), "en".into());
    let comments = CommentService::new(
        entities.clone(),
        IpRegionEnricher::disabled(entities.clone()),
        CommentListSettings {
            max_limit: 100,
            flat_mode: None,
            public_conf,
        },
    );
    let metrics = Arc::new(Metrics::new());
    let state = AppState {
        comments: Arc::new(comments),
        admin: Arc::new(AdminService::new(entities.clone(), cache)),
        origins: Arc::new(OriginResolver::new(entities, vec![TRUSTED.into()])),
        auth,
        metrics: metrics.clone(),
    };
    TestApp {
        router: router(state),
        metrics,
    }
}

pub fn form_post(uri: &str, body: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}
