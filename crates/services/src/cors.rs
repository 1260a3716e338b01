//! # CORS Origin Resolver
//!
//! The allow-set is rebuilt on every check from the trusted domains in
//! configuration plus every URL registered to every site, so a site
//! change takes effect on the next request.

use std::collections::HashSet;
use std::sync::Arc;

use domains::{DomainResult, EntityStore};
use tracing::{debug, error};
use url::Url;

use crate::cook::cook_site;

pub struct OriginResolver {
    store: Arc<dyn EntityStore>,
    trusted_domains: Vec<String>,
}

impl OriginResolver {
    pub fn new(store: Arc<dyn EntityStore>, trusted_domains: Vec<String>) -> Self {
        Self {
            store,
            trusted_domains,
        }
    }

    /// Every allowed `scheme://host[:port]` origin.
    pub async fn allowed_origins(&self) -> DomainResult<HashSet<String>> {
        let mut candidates = self.trusted_domains.clone();
        for site in self.store.find_all_sites().await? {
            candidates.extend(cook_site(&site).urls);
        }
        Ok(candidates.iter().filter_map(|u| origin_of(u)).collect())
    }

    /// `origin` is the raw `Origin` header value. When the site list cannot
    /// be loaded only the trusted domains are honored.
    pub async fn is_origin_allowed(&self, origin: &str) -> bool {
        let allowed = match self.allowed_origins().await {
            Ok(origins) => origins,
            Err(err) => {
                error!(%err, "cors: loading sites failed, using trusted domains only");
                self.trusted_domains
                    .iter()
                    .filter_map(|u| origin_of(u))
                    .collect()
            }
        };
        let ok = allowed.contains(origin);
        if !ok {
            debug!(origin, "cors: origin rejected");
        }
        ok
    }
}

/// Reduces a URL to its origin. URLs without both a scheme and a host,
/// or that fail to parse, yield `None`.
pub fn origin_of(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let url = Url::parse(raw).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}
