//! Shared fixtures: a small comment thread on one page of one site.
#![allow(dead_code)]

#[cfg(feature = "web-axum")]
pub mod http;

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use domains::{Comment, CookedComment, EntityStore, Notification, Page, SiteScope, SortBy, User};
use services::{CommentListRequest, CommentListSettings, CommentService, IpRegionEnricher};
use storage_adapters::MemoryStore;

pub const SITE: &str = "Site A";
pub const PAGE: &str = "/x.html";

pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
}

pub fn comment(id: u64, rid: u64, user_id: u64, content: &str) -> Comment {
    Comment {
        id,
        content: content.into(),
        page_key: PAGE.into(),
        site_name: SITE.into(),
        user_id,
        rid,
        is_pinned: false,
        is_pending: false,
        is_collapsed: false,
        vote_up: 0,
        vote_down: 0,
        ip: String::new(),
        ua: "Mozilla/5.0".into(),
        created_at: at(id as i64),
        updated_at: at(id as i64),
    }
}

pub fn user(id: u64, name: &str, is_admin: bool) -> User {
    User {
        id,
        name: name.into(),
        email: format!("{name}@example.com"),
        link: String::new(),
        is_admin,
    }
}

pub fn notification(id: u64, user_id: u64, comment_id: u64) -> Notification {
    Notification {
        id,
        user_id,
        comment_id,
        is_read: false,
        created_at: at(100 + id as i64),
    }
}

pub fn page() -> Page {
    Page {
        id: 1,
        title: "X".into(),
        ..Page::placeholder(PAGE, SITE)
    }
}

/// Roots 1, 2, 3 by alice; comment 4 by bob replies to 2.
pub fn thread() -> (Vec<User>, Vec<Comment>) {
    (
        vec![user(1, "alice", false), user(2, "bob", false)],
        vec![
            comment(1, 0, 1, "first root"),
            comment(2, 0, 1, "second root"),
            comment(3, 0, 1, "third root"),
            comment(4, 2, 2, "a reply to the second"),
        ],
    )
}

pub fn thread_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let (users, comments) = thread();
    users.into_iter().for_each(|u| store.insert_user(u));
    comments.into_iter().for_each(|c| store.insert_comment(c));
    store.insert_page(page());
    store
}

pub fn comment_service(store: Arc<dyn EntityStore>) -> CommentService {
    CommentService::new(
        store.clone(),
        IpRegionEnricher::disabled(store),
        CommentListSettings {
            max_limit: 100,
            ..Default::default()
        },
    )
}

pub fn request() -> CommentListRequest {
    let mut request = CommentListRequest::new(PAGE, SiteScope::Only(SITE.into()));
    request.limit = 10;
    request.sort_by = SortBy::DateAsc;
    request
}

pub fn ids(comments: &[CookedComment]) -> Vec<u64> {
    comments.iter().map(|c| c.id).collect()
}
