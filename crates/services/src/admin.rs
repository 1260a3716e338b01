//! Administrative operations: cache control and site removal.

use std::sync::Arc;

use domains::{CacheControl, DomainError, DomainResult, EntityStore, SiteId};
use tracing::{error, info, instrument};

pub const BACKGROUND_TASK_MSG: &str = "Task executing in background, please wait...";

pub struct AdminService {
    store: Arc<dyn EntityStore>,
    /// `None` when caching is disabled
    cache: Option<Arc<dyn CacheControl>>,
}

impl AdminService {
    pub fn new(store: Arc<dyn EntityStore>, cache: Option<Arc<dyn CacheControl>>) -> Self {
        Self { store, cache }
    }

    fn ensure_admin(is_admin: bool) -> DomainResult<()> {
        if is_admin {
            Ok(())
        } else {
            Err(DomainError::AccessDenied("administrator required".into()))
        }
    }

    fn cache(&self) -> DomainResult<Arc<dyn CacheControl>> {
        self.cache.clone().ok_or(DomainError::CacheDisabled)
    }

    /// Starts a warm-up in the background and returns immediately.
    pub fn cache_warm(&self, is_admin: bool) -> DomainResult<&'static str> {
        Self::ensure_admin(is_admin)?;
        let cache = self.cache()?;
        tokio::spawn(async move {
            match cache.warm_up().await {
                Ok(()) => info!("cache warm-up finished"),
                Err(err) => error!(%err, "cache warm-up failed"),
            }
        });
        Ok(BACKGROUND_TASK_MSG)
    }

    /// Only `flush_all` is supported; anything else is a parameter error.
    pub fn cache_flush(&self, is_admin: bool, flush_all: bool) -> DomainResult<&'static str> {
        Self::ensure_admin(is_admin)?;
        let cache = self.cache()?;
        if !flush_all {
            return Err(DomainError::Validation("invalid parameter `flush_all`".into()));
        }
        tokio::spawn(async move {
            match cache.flush_all().await {
                Ok(()) => info!("cache flushed"),
                Err(err) => error!(%err, "cache flush failed"),
            }
        });
        Ok(BACKGROUND_TASK_MSG)
    }

    #[instrument(skip(self))]
    pub async fn delete_site(&self, is_admin: bool, id: SiteId) -> DomainResult<()> {
        Self::ensure_admin(is_admin)?;
        let site = self
            .store
            .find_site_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Site", id))?;
        self.store.delete_site(&site).await?;
        info!(site = %site.name, "site deleted");
        Ok(())
    }
}
