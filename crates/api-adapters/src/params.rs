//! Form parameters accepted by the HTTP endpoints and their conversion
//! into validated service requests.

use domains::{DomainError, DomainResult, SiteId, SiteScope, SortBy};
use serde::{Deserialize, Deserializer};
use services::{CommentListRequest, MessageCenterType};

/// Reserved `site_name` selecting every site. Admin requests only.
pub const SITE_ALL: &str = "__ATK_SITE_ALL";

/// HTML forms send booleans as `1`/`true`/`on`; anything else is false.
fn de_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(matches!(
        raw.as_deref().map(str::trim),
        Some("1" | "true" | "on")
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentGetParams {
    #[serde(default)]
    pub page_key: String,
    #[serde(default)]
    pub site_name: String,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default, deserialize_with = "de_flag")]
    pub flat_mode: bool,
    pub sort_by: Option<String>,
    #[serde(default, deserialize_with = "de_flag")]
    pub view_only_admin: bool,
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub message_type: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl CommentGetParams {
    pub fn into_request(self, is_admin: bool) -> DomainResult<CommentListRequest> {
        let page_key = self.page_key.trim().to_string();
        if page_key.is_empty() {
            return Err(DomainError::Validation("`page_key` is required".into()));
        }

        let site = if is_admin && self.site_name == SITE_ALL {
            SiteScope::All
        } else {
            SiteScope::Only(self.site_name.trim().to_string())
        };

        let message_type = match self.message_type.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<MessageCenterType>()?),
        };

        let mut request = CommentListRequest::new(page_key, site);
        request.offset = self.offset.unwrap_or(0);
        request.limit = self.limit.unwrap_or(0);
        request.flat_mode = self.flat_mode;
        request.sort_by = self
            .sort_by
            .as_deref()
            .map(SortBy::parse)
            .unwrap_or_default();
        request.view_only_admin = self.view_only_admin;
        request.search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        request.message_type = message_type;
        request.name = self.name.map(|n| n.trim().to_string());
        request.email = self.email.map(|e| e.trim().to_string());
        request.is_admin = is_admin;
        Ok(request)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CacheFlushParams {
    #[serde(default, deserialize_with = "de_flag")]
    pub flush_all: bool,
}

#[derive(Debug, Deserialize)]
pub struct SiteDeleteParams {
    pub id: SiteId,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page_key: &str) -> CommentGetParams {
        CommentGetParams {
            page_key: page_key.into(),
            site_name: "Site A".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_page_key_is_required() {
        let err = params("  ").into_request(false).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn test_site_all_is_admin_only() {
        let p = CommentGetParams {
            site_name: SITE_ALL.into(),
            ..params("/x.html")
        };
        assert_eq!(p.into_request(true).unwrap().site, SiteScope::All);

        let p = CommentGetParams {
            site_name: SITE_ALL.into(),
            ..params("/x.html")
        };
        assert_eq!(
            p.into_request(false).unwrap().site,
            SiteScope::Only(SITE_ALL.into())
        );
    }

    #[test]
    fn test_message_type_is_parsed() {
        let p = CommentGetParams {
            message_type: Some("mentions".into()),
            ..params("/x.html")
        };
        assert_eq!(
            p.into_request(false).unwrap().message_type,
            Some(MessageCenterType::Mentions)
        );

        let p = CommentGetParams {
            message_type: Some("everything".into()),
            ..params("/x.html")
        };
        assert!(p.into_request(false).is_err());
    }

    #[test]
    fn test_defaults_and_trimming() {
        let p = CommentGetParams {
            sort_by: Some("vote".into()),
            search: Some("   ".into()),
            ..params(" /x.html ")
        };
        let request = p.into_request(false).unwrap();
        assert_eq!(request.page_key, "/x.html");
        assert_eq!(request.sort_by, SortBy::Vote);
        assert_eq!((request.offset, request.limit), (0, 0));
        assert!(request.search.is_none());
        assert!(!request.is_admin);
    }
}
