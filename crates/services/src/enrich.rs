//! # Enrichment Stage
//!
//! Best-effort IP geolocation of assembled comments. Failures are logged
//! and leave the region label empty; they never fail the request.

use std::sync::Arc;

use domains::{CookedComment, EntityStore, IpRegionLookup};
use tracing::{error, warn};

pub struct IpRegionEnricher {
    store: Arc<dyn EntityStore>,
    lookup: Option<Arc<dyn IpRegionLookup>>,
    enabled: bool,
}

impl IpRegionEnricher {
    pub fn new(
        store: Arc<dyn EntityStore>,
        lookup: Option<Arc<dyn IpRegionLookup>>,
        enabled: bool,
    ) -> Self {
        Self {
            store,
            lookup,
            enabled,
        }
    }

    pub fn disabled(store: Arc<dyn EntityStore>) -> Self {
        Self::new(store, None, false)
    }

    pub async fn enrich(&self, mut comments: Vec<CookedComment>) -> Vec<CookedComment> {
        if !self.enabled {
            return comments;
        }
        let Some(lookup) = &self.lookup else {
            error!("ip region enabled but no lookup service is configured");
            return comments;
        };

        for comment in &mut comments {
            // The cooked projection does not carry the address.
            let ip = match self.store.find_comment(comment.id).await {
                Ok(Some(raw)) if !raw.ip.is_empty() => raw.ip,
                Ok(_) => continue,
                Err(err) => {
                    warn!(comment_id = comment.id, %err, "ip region: comment reload failed");
                    continue;
                }
            };
            match lookup.query(&ip) {
                Ok(region) => comment.ip_region = region,
                Err(err) => warn!(comment_id = comment.id, %err, "ip region lookup failed"),
            }
        }
        comments
    }
}
