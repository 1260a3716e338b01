//! # Filter Builder
//!
//! Turns a comment list request into the predicate sets used by the
//! primary, count and pinned queries, and into the access checks applied
//! to comments fetched by id during expansion.

use std::str::FromStr;

use domains::{
    Comment, CommentPredicate, CommentQuery, DomainError, SiteScope, SortBy, User, UserId,
};

use crate::comments::CommentListRequest;

/// Response shape of a comment list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    /// Roots plus their recursively fetched replies
    Nested,
    /// Every match listed once, reply targets injected as hidden context
    Flat,
}

impl ListMode {
    /// `configured` pins the mode site-wide when set. Message-center reads
    /// are cross-thread and always come out flat.
    pub fn resolve(requested_flat: bool, configured: Option<bool>, message_center: bool) -> Self {
        if message_center || configured.unwrap_or(requested_flat) {
            ListMode::Flat
        } else {
            ListMode::Nested
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ListMode::Nested => "nested",
            ListMode::Flat => "flat",
        }
    }
}

/// Per-user views offered by the message center.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageCenterType {
    /// Own comments and replies to them
    All,
    Mentions,
    Mine,
    Pending,
    AdminAll,
    AdminPending,
}

impl FromStr for MessageCenterType {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "all" => Ok(Self::All),
            "mentions" => Ok(Self::Mentions),
            "mine" => Ok(Self::Mine),
            "pending" => Ok(Self::Pending),
            "admin_all" => Ok(Self::AdminAll),
            "admin_pending" => Ok(Self::AdminPending),
            other => Err(DomainError::Validation(format!(
                "unknown message center type `{other}`"
            ))),
        }
    }
}

/// Site isolation plus moderation visibility for single-comment lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentAccess {
    site: SiteScope,
    is_admin: bool,
    user_id: Option<UserId>,
}

impl CommentAccess {
    pub fn new(site: SiteScope, is_admin: bool, user_id: Option<UserId>) -> Self {
        Self {
            site,
            is_admin,
            user_id,
        }
    }

    pub fn permits(&self, comment: &Comment) -> bool {
        self.site_isolated(comment) && self.moderation_allows(comment)
    }

    fn site_isolated(&self, comment: &Comment) -> bool {
        match &self.site {
            SiteScope::All => true,
            SiteScope::Only(name) => comment.site_name == *name,
        }
    }

    fn moderation_allows(&self, comment: &Comment) -> bool {
        self.is_admin || !comment.is_pending || Some(comment.user_id) == self.user_id
    }
}

pub struct FilterBuilder<'a> {
    request: &'a CommentListRequest,
    user: Option<&'a User>,
    mode: ListMode,
    message_center: Option<MessageCenterType>,
}

impl<'a> FilterBuilder<'a> {
    pub fn new(request: &'a CommentListRequest, user: Option<&'a User>, mode: ListMode) -> Self {
        Self {
            request,
            user,
            mode,
            message_center: request.message_center(),
        }
    }

    fn user_id(&self) -> Option<UserId> {
        self.user.map(|u| u.id)
    }

    /// Site and page scope plus moderation visibility.
    fn scope(&self) -> Vec<CommentPredicate> {
        let mut scope = Vec::new();
        if let SiteScope::Only(name) = &self.request.site {
            scope.push(CommentPredicate::SiteName(name.clone()));
        }
        if self.message_center.is_none() {
            scope.push(CommentPredicate::PageKey(self.request.page_key.clone()));
        }
        if !self.request.is_admin {
            scope.push(CommentPredicate::Approved {
                or_author: self.user_id(),
            });
        }
        scope
    }

    /// Restrictions shared by the primary and count queries.
    pub fn base_scope(&self) -> Vec<CommentPredicate> {
        let mut base = self.scope();
        if self.request.view_only_admin {
            base.push(CommentPredicate::AdminAuthorsOnly);
        }
        if let Some(kind) = self.message_center {
            base.extend(self.message_center_scope(kind));
        }
        base
    }

    fn message_center_scope(&self, kind: MessageCenterType) -> Vec<CommentPredicate> {
        use domains::CommentPredicate as P;

        let user_id = self.user_id();
        let is_admin = self.request.is_admin;
        match (kind, user_id) {
            (MessageCenterType::All, Some(id)) => vec![P::AuthoredOrRepliesTo(id)],
            (MessageCenterType::Mentions, Some(id)) => vec![P::RepliesTo(id)],
            (MessageCenterType::Mine, Some(id)) => vec![P::AuthoredBy(id)],
            (MessageCenterType::Pending, Some(id)) => vec![P::AuthoredBy(id), P::PendingOnly],
            (MessageCenterType::AdminAll, _) if is_admin => vec![],
            (MessageCenterType::AdminPending, _) if is_admin => vec![P::PendingOnly],
            _ => vec![P::Nothing],
        }
    }

    /// The paginated query whose rows seed assembly.
    pub fn primary_query(&self) -> CommentQuery {
        let mut query = CommentQuery::new(self.base_scope()).sorted(self.request.sort_by);
        if self.mode == ListMode::Nested {
            query = query.with(CommentPredicate::RootOnly);
        }
        // Pinned rows come from their own query; the message center lists
        // per-user activity and keeps them.
        if self.message_center.is_none() {
            query = query.with(CommentPredicate::ExcludePinned);
        }
        if let Some(search) = self.search() {
            query = query.with(CommentPredicate::Search(search.to_string()));
        }
        query
    }

    pub fn root_count_query(&self) -> CommentQuery {
        self.primary_query().with(CommentPredicate::RootOnly)
    }

    pub fn pinned_query(&self) -> CommentQuery {
        CommentQuery::new(self.scope())
            .with(CommentPredicate::PinnedOnly)
            .sorted(SortBy::DateDesc)
    }

    pub fn access(&self) -> CommentAccess {
        CommentAccess::new(
            self.request.site.clone(),
            self.request.is_admin,
            self.user_id(),
        )
    }

    fn search(&self) -> Option<&str> {
        self.request
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::CommentPredicate as P;

    fn request() -> CommentListRequest {
        CommentListRequest::new("/x.html", SiteScope::Only("Site A".into()))
    }

    fn user() -> User {
        User {
            id: 9,
            name: "bob".into(),
            email: "bob@example.com".into(),
            link: String::new(),
            is_admin: false,
        }
    }

    #[test]
    fn test_nested_primary_is_root_only_without_pinned() {
        let req = request();
        let query = FilterBuilder::new(&req, None, ListMode::Nested).primary_query();
        assert_eq!(
            query.predicates,
            vec![
                P::SiteName("Site A".into()),
                P::PageKey("/x.html".into()),
                P::Approved { or_author: None },
                P::RootOnly,
                P::ExcludePinned,
            ]
        );
    }

    #[test]
    fn test_flat_primary_keeps_replies() {
        let req = request();
        let query = FilterBuilder::new(&req, None, ListMode::Flat).primary_query();
        assert!(!query.has(&P::RootOnly));
        assert!(query.has(&P::ExcludePinned));
    }

    #[test]
    fn test_search_composes_with_other_predicates() {
        let mut req = request();
        req.search = Some("  rust ".into());
        let query = FilterBuilder::new(&req, None, ListMode::Nested).primary_query();
        assert!(query.has(&P::Search("rust".into())));
        assert!(query.has(&P::RootOnly));
        assert!(query.has(&P::PageKey("/x.html".into())));

        req.search = Some("   ".into());
        let query = FilterBuilder::new(&req, None, ListMode::Nested).primary_query();
        assert!(!query.predicates.iter().any(|p| matches!(p, P::Search(_))));
    }

    #[test]
    fn test_all_sites_has_no_site_restriction() {
        let mut req = CommentListRequest::new("/x.html", SiteScope::All);
        req.is_admin = true;
        let query = FilterBuilder::new(&req, None, ListMode::Flat).primary_query();
        assert!(!query.predicates.iter().any(|p| matches!(p, P::SiteName(_))));
        assert!(!query.predicates.iter().any(|p| matches!(p, P::Approved { .. })));
    }

    #[test]
    fn test_message_center_keeps_pinned_and_drops_page() {
        let mut req = request();
        req.message_type = Some(MessageCenterType::Mine);
        req.name = Some("bob".into());
        req.email = Some("bob@example.com".into());
        let u = user();
        let query = FilterBuilder::new(&req, Some(&u), ListMode::Flat).primary_query();
        assert!(!query.has(&P::ExcludePinned));
        assert!(!query.predicates.iter().any(|p| matches!(p, P::PageKey(_))));
        assert!(query.has(&P::AuthoredBy(9)));
        assert!(query.has(&P::Approved { or_author: Some(9) }));
    }

    #[test]
    fn test_message_center_without_user_matches_nothing() {
        let mut req = request();
        req.message_type = Some(MessageCenterType::Mentions);
        req.name = Some("ghost".into());
        req.email = Some("ghost@example.com".into());
        let query = FilterBuilder::new(&req, None, ListMode::Flat).primary_query();
        assert!(query.has(&P::Nothing));
    }

    #[test]
    fn test_admin_types_require_admin() {
        let mut req = request();
        req.message_type = Some(MessageCenterType::AdminPending);
        req.name = Some("bob".into());
        req.email = Some("bob@example.com".into());
        let u = user();
        let query = FilterBuilder::new(&req, Some(&u), ListMode::Flat).primary_query();
        assert!(query.has(&P::Nothing));

        req.is_admin = true;
        let query = FilterBuilder::new(&req, Some(&u), ListMode::Flat).primary_query();
        assert!(query.has(&P::PendingOnly));
        assert!(!query.has(&P::Nothing));
    }

    #[test]
    fn test_pinned_query_ignores_search_and_pagination_filters() {
        let mut req = request();
        req.search = Some("rust".into());
        req.view_only_admin = true;
        let query = FilterBuilder::new(&req, None, ListMode::Nested).pinned_query();
        assert_eq!(
            query.predicates,
            vec![
                P::SiteName("Site A".into()),
                P::PageKey("/x.html".into()),
                P::Approved { or_author: None },
                P::PinnedOnly,
            ]
        );
    }

    #[test]
    fn test_mode_resolution() {
        assert_eq!(ListMode::resolve(false, None, false), ListMode::Nested);
        assert_eq!(ListMode::resolve(true, None, false), ListMode::Flat);
        assert_eq!(ListMode::resolve(true, Some(false), false), ListMode::Nested);
        assert_eq!(ListMode::resolve(false, Some(false), true), ListMode::Flat);
    }

    #[test]
    fn test_access_checks_site_and_moderation() {
        let now = Utc::now();
        let mut c = Comment {
            id: 1,
            content: String::new(),
            page_key: "/x.html".into(),
            site_name: "Site A".into(),
            user_id: 9,
            rid: 0,
            is_pinned: false,
            is_pending: true,
            is_collapsed: false,
            vote_up: 0,
            vote_down: 0,
            ip: String::new(),
            ua: String::new(),
            created_at: now,
            updated_at: now,
        };
        let guest = CommentAccess::new(SiteScope::Only("Site A".into()), false, None);
        let author = CommentAccess::new(SiteScope::Only("Site A".into()), false, Some(9));
        assert!(!guest.permits(&c));
        assert!(author.permits(&c));

        c.is_pending = false;
        c.site_name = "Site B".into();
        assert!(!guest.permits(&c));
        assert!(CommentAccess::new(SiteScope::All, true, None).permits(&c));
    }

    #[test]
    fn test_message_center_type_parse() {
        assert_eq!("mentions".parse::<MessageCenterType>().unwrap(), MessageCenterType::Mentions);
        assert!("everything".parse::<MessageCenterType>().is_err());
    }
}
