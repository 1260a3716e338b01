//! Read-through cache in front of any [`EntityStore`].
//!
//! Pages and users are looked up on every comment request; the cache keeps
//! them in `DashMap`s. Warm-up preloads both tables, flush drops
//! everything. Both are safe to run concurrently with each other and with
//! readers: a concurrent flush merely turns later reads into misses.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use domains::{
    CacheControl, Comment, CommentId, CommentQuery, DomainResult, EntityStore, Notification, Page,
    Pagination, Site, SiteId, User, UserId,
};
use tracing::info;

pub struct CachedStore {
    inner: Arc<dyn EntityStore>,
    /// (page key, site name) -> page
    pages: DashMap<(String, String), Page>,
    users: DashMap<UserId, User>,
    /// (name, email) -> user id
    user_keys: DashMap<(String, String), UserId>,
}

impl CachedStore {
    pub fn new(inner: Arc<dyn EntityStore>) -> Self {
        Self {
            inner,
            pages: DashMap::new(),
            users: DashMap::new(),
            user_keys: DashMap::new(),
        }
    }

    fn remember_page(&self, page: &Page) {
        self.pages
            .insert((page.key.clone(), page.site_name.clone()), page.clone());
    }

    fn remember_user(&self, user: &User) {
        self.user_keys
            .insert((user.name.clone(), user.email.clone()), user.id);
        self.users.insert(user.id, user.clone());
    }

    pub fn cached_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn cached_users(&self) -> usize {
        self.users.len()
    }
}

#[async_trait]
impl CacheControl for CachedStore {
    async fn warm_up(&self) -> DomainResult<()> {
        let pages = self.inner.list_pages().await?;
        let users = self.inner.list_users().await?;
        pages.iter().for_each(|p| self.remember_page(p));
        users.iter().for_each(|u| self.remember_user(u));
        info!(pages = pages.len(), users = users.len(), "cache warmed");
        Ok(())
    }

    async fn flush_all(&self) -> DomainResult<()> {
        self.pages.clear();
        self.users.clear();
        self.user_keys.clear();
        Ok(())
    }
}

#[async_trait]
impl EntityStore for CachedStore {
    async fn find_comments(
        &self,
        query: &CommentQuery,
        pagination: Pagination,
    ) -> DomainResult<Vec<Comment>> {
        self.inner.find_comments(query, pagination).await
    }

    async fn count_comments(&self, query: &CommentQuery) -> DomainResult<i64> {
        self.inner.count_comments(query).await
    }

    async fn find_comment(&self, id: CommentId) -> DomainResult<Option<Comment>> {
        self.inner.find_comment(id).await
    }

    async fn find_comment_children(&self, parent_id: CommentId) -> DomainResult<Vec<Comment>> {
        self.inner.find_comment_children(parent_id).await
    }

    async fn find_page(&self, key: &str, site_name: &str) -> DomainResult<Option<Page>> {
        let cache_key = (key.to_string(), site_name.to_string());
        if let Some(page) = self.pages.get(&cache_key) {
            return Ok(Some(page.value().clone()));
        }
        let page = self.inner.find_page(key, site_name).await?;
        if let Some(page) = &page {
            self.remember_page(page);
        }
        Ok(page)
    }

    async fn list_pages(&self) -> DomainResult<Vec<Page>> {
        self.inner.list_pages().await
    }

    async fn find_user(&self, name: &str, email: &str) -> DomainResult<Option<User>> {
        let cached = self
            .user_keys
            .get(&(name.to_string(), email.to_string()))
            .and_then(|id| self.users.get(id.value()).map(|u| u.value().clone()));
        if cached.is_some() {
            return Ok(cached);
        }
        let user = self.inner.find_user(name, email).await?;
        if let Some(user) = &user {
            self.remember_user(user);
        }
        Ok(user)
    }

    async fn find_user_by_id(&self, id: UserId) -> DomainResult<Option<User>> {
        if let Some(user) = self.users.get(&id) {
            return Ok(Some(user.value().clone()));
        }
        let user = self.inner.find_user_by_id(id).await?;
        if let Some(user) = &user {
            self.remember_user(user);
        }
        Ok(user)
    }

    async fn list_users(&self) -> DomainResult<Vec<User>> {
        self.inner.list_users().await
    }

    async fn find_unread_notifications(&self, user_id: UserId) -> DomainResult<Vec<Notification>> {
        self.inner.find_unread_notifications(user_id).await
    }

    async fn mark_all_notifications_read(&self, user_id: UserId) -> DomainResult<()> {
        self.inner.mark_all_notifications_read(user_id).await
    }

    async fn find_all_sites(&self) -> DomainResult<Vec<Site>> {
        self.inner.find_all_sites().await
    }

    async fn find_site_by_id(&self, id: SiteId) -> DomainResult<Option<Site>> {
        self.inner.find_site_by_id(id).await
    }

    async fn delete_site(&self, site: &Site) -> DomainResult<()> {
        self.inner.delete_site(site).await?;
        self.pages.retain(|(_, site_name), _| *site_name != site.name);
        Ok(())
    }
}
