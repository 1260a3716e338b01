//! In-memory implementation of [`EntityStore`].
//!
//! Backed by `DashMap`s; used when no database is configured and as the
//! fixture store in tests.

use async_trait::async_trait;
use dashmap::DashMap;
use domains::{
    Comment, CommentId, CommentPredicate, CommentQuery, DomainResult, EntityStore, Notification,
    NotificationId, Page, PageId, Pagination, Site, SiteId, SortBy, User, UserId,
};

#[derive(Default)]
pub struct MemoryStore {
    comments: DashMap<CommentId, Comment>,
    pages: DashMap<PageId, Page>,
    users: DashMap<UserId, User>,
    notifications: DashMap<NotificationId, Notification>,
    sites: DashMap<SiteId, Site>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_comment(&self, comment: Comment) {
        self.comments.insert(comment.id, comment);
    }

    pub fn insert_page(&self, page: Page) {
        self.pages.insert(page.id, page);
    }

    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    pub fn insert_notification(&self, notification: Notification) {
        self.notifications.insert(notification.id, notification);
    }

    pub fn insert_site(&self, site: Site) {
        self.sites.insert(site.id, site);
    }

    pub fn notification(&self, id: NotificationId) -> Option<Notification> {
        self.notifications.get(&id).map(|n| n.value().clone())
    }

    /// Snapshot so predicate evaluation can look rows up without holding
    /// a shard lock.
    fn all_comments(&self) -> Vec<Comment> {
        self.comments.iter().map(|e| e.value().clone()).collect()
    }

    fn parent_author(&self, comment: &Comment) -> Option<UserId> {
        if comment.is_root() {
            return None;
        }
        self.comments.get(&comment.rid).map(|p| p.user_id)
    }

    fn author_matches(&self, user_id: UserId, f: impl Fn(&User) -> bool) -> bool {
        self.users.get(&user_id).is_some_and(|u| f(u.value()))
    }

    fn matches(&self, comment: &Comment, predicate: &CommentPredicate) -> bool {
        use domains::CommentPredicate as P;

        match predicate {
            P::PageKey(key) => comment.page_key == *key,
            P::SiteName(name) => comment.site_name == *name,
            P::RootOnly => comment.is_root(),
            P::PinnedOnly => comment.is_pinned,
            P::ExcludePinned => !comment.is_pinned,
            P::Search(keyword) => {
                let keyword = keyword.to_lowercase();
                comment.content.to_lowercase().contains(&keyword)
                    || self.author_matches(comment.user_id, |u| {
                        u.name.to_lowercase() == keyword || u.email.to_lowercase() == keyword
                    })
            }
            P::Approved { or_author } => !comment.is_pending || Some(comment.user_id) == *or_author,
            P::PendingOnly => comment.is_pending,
            P::AuthoredBy(id) => comment.user_id == *id,
            P::RepliesTo(id) => self.parent_author(comment) == Some(*id),
            P::AuthoredOrRepliesTo(id) => {
                comment.user_id == *id || self.parent_author(comment) == Some(*id)
            }
            P::AdminAuthorsOnly => self.author_matches(comment.user_id, |u| u.is_admin),
            P::Nothing => false,
        }
    }

    fn filter(&self, query: &CommentQuery) -> Vec<Comment> {
        let mut rows: Vec<Comment> = self
            .all_comments()
            .into_iter()
            .filter(|c| query.predicates.iter().all(|p| self.matches(c, p)))
            .collect();
        sort_comments(&mut rows, query.sort);
        rows
    }
}

fn sort_comments(rows: &mut [Comment], sort: SortBy) {
    match sort {
        SortBy::DateAsc => rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))),
        SortBy::DateDesc => {
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
        }
        SortBy::Vote => rows.sort_by(|a, b| {
            b.vote_up
                .cmp(&a.vote_up)
                .then(b.created_at.cmp(&a.created_at))
        }),
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn find_comments(
        &self,
        query: &CommentQuery,
        pagination: Pagination,
    ) -> DomainResult<Vec<Comment>> {
        Ok(self
            .filter(query)
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit() as usize)
            .collect())
    }

    async fn count_comments(&self, query: &CommentQuery) -> DomainResult<i64> {
        Ok(self.filter(query).len() as i64)
    }

    async fn find_comment(&self, id: CommentId) -> DomainResult<Option<Comment>> {
        Ok(self.comments.get(&id).map(|c| c.value().clone()))
    }

    async fn find_comment_children(&self, parent_id: CommentId) -> DomainResult<Vec<Comment>> {
        let mut children: Vec<Comment> = self
            .all_comments()
            .into_iter()
            .filter(|c| c.rid == parent_id && parent_id != 0)
            .collect();
        sort_comments(&mut children, SortBy::DateAsc);
        Ok(children)
    }

    async fn find_page(&self, key: &str, site_name: &str) -> DomainResult<Option<Page>> {
        Ok(self
            .pages
            .iter()
            .find(|p| p.key == key && p.site_name == site_name)
            .map(|p| p.value().clone()))
    }

    async fn list_pages(&self) -> DomainResult<Vec<Page>> {
        Ok(self.pages.iter().map(|p| p.value().clone()).collect())
    }

    async fn find_user(&self, name: &str, email: &str) -> DomainResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.name == name && u.email == email)
            .map(|u| u.value().clone()))
    }

    async fn find_user_by_id(&self, id: UserId) -> DomainResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn list_users(&self) -> DomainResult<Vec<User>> {
        Ok(self.users.iter().map(|u| u.value().clone()).collect())
    }

    async fn find_unread_notifications(&self, user_id: UserId) -> DomainResult<Vec<Notification>> {
        let mut unread: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .map(|n| n.value().clone())
            .collect();
        unread.sort_by_key(|n| (n.created_at, n.id));
        Ok(unread)
    }

    async fn mark_all_notifications_read(&self, user_id: UserId) -> DomainResult<()> {
        self.notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id)
            .for_each(|mut n| n.is_read = true);
        Ok(())
    }

    async fn find_all_sites(&self) -> DomainResult<Vec<Site>> {
        let mut sites: Vec<Site> = self.sites.iter().map(|s| s.value().clone()).collect();
        sites.sort_by_key(|s| s.id);
        Ok(sites)
    }

    async fn find_site_by_id(&self, id: SiteId) -> DomainResult<Option<Site>> {
        Ok(self.sites.get(&id).map(|s| s.value().clone()))
    }

    async fn delete_site(&self, site: &Site) -> DomainResult<()> {
        self.sites.remove(&site.id);
        self.pages.retain(|_, p| p.site_name != site.name);
        self.comments.retain(|_, c| c.site_name != site.name);
        Ok(())
    }
}
