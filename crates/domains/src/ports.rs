//! # Ports
//!
//! Contracts every adapter must implement to be wired into the binary.

use async_trait::async_trait;

use crate::errors::DomainResult;
use crate::models::{Comment, CommentId, Notification, Page, Site, SiteId, User, UserId};
use crate::query::{CommentQuery, Pagination};

/// Typed lookups over comments, pages, users, notifications and sites.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait EntityStore: Send + Sync {
    // Comment operations
    async fn find_comments(
        &self,
        query: &CommentQuery,
        pagination: Pagination,
    ) -> DomainResult<Vec<Comment>>;
    /// Counts rows matching the query, ignoring pagination.
    async fn count_comments(&self, query: &CommentQuery) -> DomainResult<i64>;
    async fn find_comment(&self, id: CommentId) -> DomainResult<Option<Comment>>;
    /// Direct replies to `parent_id`, oldest first.
    async fn find_comment_children(&self, parent_id: CommentId) -> DomainResult<Vec<Comment>>;

    // Page operations
    async fn find_page(&self, key: &str, site_name: &str) -> DomainResult<Option<Page>>;
    async fn list_pages(&self) -> DomainResult<Vec<Page>>;

    // User operations
    async fn find_user(&self, name: &str, email: &str) -> DomainResult<Option<User>>;
    async fn find_user_by_id(&self, id: UserId) -> DomainResult<Option<User>>;
    async fn list_users(&self) -> DomainResult<Vec<User>>;

    // Notification operations
    async fn find_unread_notifications(&self, user_id: UserId) -> DomainResult<Vec<Notification>>;
    /// Idempotent: already-read notifications are left untouched.
    async fn mark_all_notifications_read(&self, user_id: UserId) -> DomainResult<()>;

    // Site operations
    async fn find_all_sites(&self) -> DomainResult<Vec<Site>>;
    async fn find_site_by_id(&self, id: SiteId) -> DomainResult<Option<Site>>;
    /// Removes the site together with its pages and their comments.
    async fn delete_site(&self, site: &Site) -> DomainResult<()>;
}

/// IP geolocation black box.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait IpRegionLookup: Send + Sync {
    /// Returns a human readable region label, empty when unknown.
    fn query(&self, ip: &str) -> DomainResult<String>;
}

/// Cache warm-up and flush hooks exposed to administrators.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CacheControl: Send + Sync {
    async fn warm_up(&self) -> DomainResult<()>;
    async fn flush_all(&self) -> DomainResult<()>;
}

/// Decides whether a request carries administrator credentials.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AdminVerifier: Send + Sync {
    async fn verify_admin_token(&self, token: &str) -> bool;
}
