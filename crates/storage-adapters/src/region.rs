//! Prefix-table implementation of [`IpRegionLookup`].
//!
//! Entries map a textual address prefix (e.g. `"203.0.113."`) to a region
//! label; the longest matching prefix wins. A prefix only matches whole
//! octets or hextets, so `"1.2"` covers `1.2.x.x` but not `1.23.x.x`.

use std::net::IpAddr;

use domains::{DomainError, DomainResult, IpRegionLookup};

#[derive(Debug, Clone, Default)]
pub struct RegionTable {
    entries: Vec<(String, String)>,
}

impl RegionTable {
    pub fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut entries: Vec<(String, String)> = entries
            .into_iter()
            .filter(|(prefix, _)| !prefix.is_empty())
            .collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IpRegionLookup for RegionTable {
    fn query(&self, ip: &str) -> DomainResult<String> {
        let addr: IpAddr = ip
            .trim()
            .parse()
            .map_err(|_| DomainError::Enrichment(format!("invalid ip address `{ip}`")))?;
        let addr = addr.to_string();
        Ok(self
            .entries
            .iter()
            .find(|(prefix, _)| covers(prefix, &addr))
            .map(|(_, region)| region.clone())
            .unwrap_or_default())
    }
}

fn covers(prefix: &str, addr: &str) -> bool {
    match addr.strip_prefix(prefix) {
        Some(rest) => {
            rest.is_empty()
                || prefix.ends_with(['.', ':'])
                || rest.starts_with(['.', ':'])
        }
        None => false,
    }
}
