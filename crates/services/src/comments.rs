//! # Comment Assembler
//!
//! Turns a filtered, paginated row set into the comment list a client
//! renders: pinned comments first, then either the nested tree or the
//! flat list with hidden reply targets, plus counts, unread notifications
//! and region labels.

use std::collections::HashSet;
use std::sync::Arc;

use domains::{
    Comment, CommentId, CookedComment, CookedNotify, CookedPage, DomainResult, EntityStore, Page,
    Pagination, SiteScope, SortBy, User,
};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::cook::{cook_page, Cooker};
use crate::enrich::IpRegionEnricher;
use crate::filter::{CommentAccess, FilterBuilder, ListMode, MessageCenterType};
use crate::notify::NotificationService;

/// A validated comment list request.
#[derive(Debug, Clone)]
pub struct CommentListRequest {
    pub page_key: String,
    pub site: SiteScope,
    pub offset: i64,
    /// 0 means "as many as the server allows"
    pub limit: i64,
    pub flat_mode: bool,
    pub sort_by: SortBy,
    pub view_only_admin: bool,
    pub search: Option<String>,
    pub message_type: Option<MessageCenterType>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub is_admin: bool,
}

impl CommentListRequest {
    pub fn new(page_key: impl Into<String>, site: SiteScope) -> Self {
        Self {
            page_key: page_key.into(),
            site,
            offset: 0,
            limit: 0,
            flat_mode: false,
            sort_by: SortBy::default(),
            view_only_admin: false,
            search: None,
            message_type: None,
            name: None,
            email: None,
            is_admin: false,
        }
    }

    /// Name and email identifying the acting user, when both are given.
    pub fn identity(&self) -> Option<(&str, &str)> {
        let name = self.name.as_deref().filter(|n| !n.is_empty())?;
        let email = self.email.as_deref().filter(|e| !e.is_empty())?;
        Some((name, email))
    }

    /// A message-center read needs a type plus a full identity.
    pub fn message_center(&self) -> Option<MessageCenterType> {
        self.identity().and(self.message_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiVersion {
    pub app: String,
    pub version: String,
}

impl ApiVersion {
    pub fn current() -> Self {
        Self {
            app: "rusty-talk".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentListResponse {
    pub comments: Vec<CookedComment>,
    pub total: i64,
    pub total_roots: i64,
    pub page: CookedPage,
    pub unread: Vec<CookedNotify>,
    pub unread_count: usize,
    pub api_version: ApiVersion,
    /// Public configuration snapshot, first page only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conf: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(skip)]
    pub mode: ListMode,
}

/// Server-side knobs for comment listing.
#[derive(Debug, Clone, Default)]
pub struct CommentListSettings {
    pub max_limit: i64,
    /// Pins nested/flat mode site-wide when set
    pub flat_mode: Option<bool>,
    pub public_conf: serde_json::Map<String, serde_json::Value>,
}

pub struct CommentService {
    store: Arc<dyn EntityStore>,
    notifications: NotificationService,
    enricher: IpRegionEnricher,
    settings: CommentListSettings,
}

impl CommentService {
    pub fn new(
        store: Arc<dyn EntityStore>,
        enricher: IpRegionEnricher,
        settings: CommentListSettings,
    ) -> Self {
        Self {
            notifications: NotificationService::new(store.clone()),
            store,
            enricher,
            settings,
        }
    }

    /// Lists one page of comments for a page or the message center.
    ///
    /// Pinned comments are prepended on every page, except in the message
    /// center, whose primary query already carries pinned rows.
    #[instrument(
        skip(self, request),
        fields(page_key = %request.page_key, offset = request.offset, flat = request.flat_mode)
    )]
    pub async fn list(&self, request: &CommentListRequest) -> DomainResult<CommentListResponse> {
        let page = self.resolve_page(request).await?;
        let user = self.resolve_user(request).await?;

        let message_center = request.message_center();
        let mode = ListMode::resolve(
            request.flat_mode,
            self.settings.flat_mode,
            message_center.is_some(),
        );
        let filters = FilterBuilder::new(request, user.as_ref(), mode);
        let pagination = Pagination::new(request.offset, request.limit, self.settings.max_limit);

        let mut rows = self
            .store
            .find_comments(&filters.primary_query(), pagination)
            .await?;

        // The message center keeps pinned rows in its primary query.
        if message_center.is_none() {
            let mut pinned = self
                .store
                .find_comments(&filters.pinned_query(), Pagination::new(0, 0, 0))
                .await?;
            pinned.append(&mut rows);
            rows = pinned;
        }

        let mut cooker = Cooker::new(self.store.as_ref());
        let cooked = cooker.comments(&rows).await?;
        let access = filters.access();
        let comments = match mode {
            ListMode::Nested => self.expand_nested(&mut cooker, cooked, &access).await?,
            ListMode::Flat => {
                self.resolve_linked(&mut cooker, &rows, cooked, &access)
                    .await?
            }
        };

        let total = self.store.count_comments(&filters.primary_query()).await?;
        let total_roots = self
            .store
            .count_comments(&filters.root_count_query())
            .await?;

        if let (Some(_), Some(user)) = (message_center, user.as_ref()) {
            self.notifications.mark_all_read(user).await?;
        }
        let unread = self.notifications.unread(user.as_ref()).await?;

        let comments = self.enricher.enrich(comments).await;
        debug!(returned = comments.len(), total, total_roots, "comments assembled");

        Ok(CommentListResponse {
            comments,
            total,
            total_roots,
            page: cook_page(&page),
            unread_count: unread.len(),
            unread,
            api_version: ApiVersion::current(),
            conf: pagination
                .is_first_page()
                .then(|| self.settings.public_conf.clone()),
            mode,
        })
    }

    async fn resolve_page(&self, request: &CommentListRequest) -> DomainResult<Page> {
        let SiteScope::Only(site_name) = &request.site else {
            return Ok(Page::placeholder(request.page_key.as_str(), ""));
        };
        Ok(self
            .store
            .find_page(&request.page_key, site_name)
            .await?
            .unwrap_or_else(|| Page::placeholder(request.page_key.as_str(), site_name.as_str())))
    }

    async fn resolve_user(&self, request: &CommentListRequest) -> DomainResult<Option<User>> {
        match request.identity() {
            Some((name, email)) => self.store.find_user(name, email).await,
            None => Ok(None),
        }
    }

    /// Breadth-first walk appending every reply below the seed comments.
    /// Appended replies are themselves expanded.
    async fn expand_nested(
        &self,
        cooker: &mut Cooker<'_>,
        seed: Vec<CookedComment>,
        access: &CommentAccess,
    ) -> DomainResult<Vec<CookedComment>> {
        let mut seen: HashSet<CommentId> = seed.iter().map(|c| c.id).collect();
        let mut out = seed;
        let mut cursor = 0;
        while cursor < out.len() {
            let parent_id = out[cursor].id;
            cursor += 1;

            let children: Vec<Comment> = self
                .store
                .find_comment_children(parent_id)
                .await?
                .into_iter()
                .filter(|c| access.permits(c) && seen.insert(c.id))
                .collect();
            out.extend(cooker.comments(&children).await?);
        }
        Ok(out)
    }

    /// Appends each reply target missing from the list, marked invisible.
    async fn resolve_linked(
        &self,
        cooker: &mut Cooker<'_>,
        rows: &[Comment],
        mut cooked: Vec<CookedComment>,
        access: &CommentAccess,
    ) -> DomainResult<Vec<CookedComment>> {
        let mut present: HashSet<CommentId> = cooked.iter().map(|c| c.id).collect();
        for row in rows {
            if row.is_root() || present.contains(&row.rid) {
                continue;
            }
            let Some(parent) = self.store.find_comment(row.rid).await? else {
                continue;
            };
            if !access.permits(&parent) {
                continue;
            }
            let mut linked = cooker.comment(&parent).await?;
            linked.visible = false;
            present.insert(linked.id);
            cooked.push(linked);
        }
        Ok(cooked)
    }
}
