//! # Domain Models
//!
//! Persisted entities of the comment backend and their "cooked" read-model
//! projections. Cooked values are built fresh per request and never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type CommentId = u64;
pub type PageId = u64;
pub type UserId = u64;
pub type SiteId = u64;
pub type NotificationId = u64;

/// A single comment as persisted by the entity store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub content: String,
    /// Key of the page (usually a URL path) the comment belongs to
    pub page_key: String,
    pub site_name: String,
    pub user_id: UserId,
    /// Id of the comment this one replies to, 0 for root comments
    pub rid: CommentId,
    pub is_pinned: bool,
    /// Awaiting moderation; hidden from everyone but admins and the author
    pub is_pending: bool,
    pub is_collapsed: bool,
    pub vote_up: i64,
    pub vote_down: i64,
    pub ip: String,
    pub ua: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn is_root(&self) -> bool {
        self.rid == 0
    }
}

/// Read-model of a [`Comment`], safe to hand to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookedComment {
    pub id: CommentId,
    pub content: String,
    pub user_id: UserId,
    pub nick: String,
    /// Hex SHA-256 of the normalized author email (avatar lookups)
    pub email_hash: String,
    pub link: String,
    pub is_admin: bool,
    pub page_key: String,
    pub site_name: String,
    pub rid: CommentId,
    pub is_pinned: bool,
    pub is_pending: bool,
    pub is_collapsed: bool,
    pub vote_up: i64,
    pub vote_down: i64,
    pub ua: String,
    pub date: String,
    /// False for comments pulled in only as reply targets in flat mode
    pub visible: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip_region: String,
}

/// A content URL within a site. Comments attach to pages by key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub key: String,
    pub title: String,
    pub site_name: String,
    pub admin_only: bool,
    pub vote_up: i64,
    pub vote_down: i64,
    pub pv: i64,
}

impl Page {
    /// Stand-in for a page that has not been created yet. Carries only the
    /// key and site so the client can still render an empty thread.
    pub fn placeholder(key: impl Into<String>, site_name: impl Into<String>) -> Self {
        Self {
            id: 0,
            key: key.into(),
            title: String::new(),
            site_name: site_name.into(),
            admin_only: false,
            vote_up: 0,
            vote_down: 0,
            pv: 0,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookedPage {
    pub id: PageId,
    pub key: String,
    pub title: String,
    pub site_name: String,
    pub admin_only: bool,
    pub vote_up: i64,
    pub vote_down: i64,
    pub pv: i64,
}

/// A commenter. Identified by (name, email) in the message center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub link: String,
    pub is_admin: bool,
}

/// A reply notification owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    /// The comment that triggered the notification
    pub comment_id: CommentId,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookedNotify {
    pub id: NotificationId,
    pub user_id: UserId,
    pub comment_id: CommentId,
    pub is_read: bool,
    pub date: String,
}

/// A registered content origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    pub name: String,
    /// Comma separated list of URLs, stored as entered by the admin
    pub urls: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookedSite {
    pub id: SiteId,
    pub name: String,
    pub urls: Vec<String>,
    pub first_url: String,
}
