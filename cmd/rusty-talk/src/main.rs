//! # Rusty-Talk Binary
//!
//! Assembles the comment backend from configuration and compile-time
//! features, then serves it over HTTP.

use std::sync::Arc;

use anyhow::Context;
use api_adapters::{router, AppState, Metrics};
use auth_adapters::Argon2AdminVerifier;
use configs::Settings;
use domains::{CacheControl, EntityStore, IpRegionLookup};
use secrecy::ExposeSecret;
use services::{
    AdminService, CommentListSettings, CommentService, IpRegionEnricher, OriginResolver,
};
use storage_adapters::{CachedStore, MemoryStore, RegionTable};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn open_store(settings: &Settings) -> anyhow::Result<Arc<dyn EntityStore>> {
    let Some(url) = settings.database.url.as_ref() else {
        info!("no database configured, using the in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    };

    #[cfg(feature = "db-sqlite")]
    {
        let store = storage_adapters::SqliteStore::connect(url.expose_secret())
            .await
            .context("failed to open the SQLite database")?;
        Ok(Arc::new(store))
    }

    #[cfg(not(feature = "db-sqlite"))]
    {
        let _ = url;
        warn!("database.url is set but the `db-sqlite` feature is disabled; using the in-memory store");
        Ok(Arc::new(MemoryStore::new()))
    }
}

async fn build_state(settings: &Settings) -> anyhow::Result<AppState> {
    // 1. Storage, optionally behind the read-through cache
    let backing = open_store(settings).await?;
    let (store, cache): (Arc<dyn EntityStore>, Option<Arc<dyn CacheControl>>) =
        if settings.cache.enabled {
            let cached = Arc::new(CachedStore::new(backing));
            let store: Arc<dyn EntityStore> = cached.clone();
            let cache: Arc<dyn CacheControl> = cached;
            (store, Some(cache))
        } else {
            (backing, None)
        };

    // 2. IP geolocation
    let regions = RegionTable::new(
        settings
            .ip_region
            .entries
            .iter()
            .map(|e| (e.prefix.clone(), e.region.clone())),
    );
    if settings.ip_region.enabled && regions.is_empty() {
        warn!("ip_region is enabled but no region entries are configured");
    }
    let lookup: Arc<dyn IpRegionLookup> = Arc::new(regions);
    let enricher = IpRegionEnricher::new(store.clone(), Some(lookup), settings.ip_region.enabled);

    // 3. Services
    let public_conf = match serde_json::to_value(&settings.frontend)? {
        serde_json::Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    let comments = CommentService::new(
        store.clone(),
        enricher,
        CommentListSettings {
            max_limit: settings.pagination.max_limit,
            flat_mode: settings.frontend.flat_mode,
            public_conf,
        },
    );
    let admin = AdminService::new(store.clone(), cache);
    let origins = OriginResolver::new(store, settings.trusted_domains.clone());

    // 4. Admin auth
    let auth = Argon2AdminVerifier::new(
        settings
            .admin
            .token_hash
            .as_ref()
            .map(|h| h.expose_secret().to_string()),
    );
    if !auth.is_configured() {
        warn!("admin.token_hash is not set; admin routes are disabled");
    }

    Ok(AppState {
        comments: Arc::new(comments),
        admin: Arc::new(admin),
        origins: Arc::new(origins),
        auth: Arc::new(auth),
        metrics: Arc::new(Metrics::new()),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load configuration")?;
    init_tracing(settings.log.json);

    let state = build_state(&settings).await?;
    let app = router(state);

    let addr = settings.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("rusty-talk listening on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
