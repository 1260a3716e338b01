//! Projection of persisted entities into their client-facing read models.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use domains::{
    Comment, CookedComment, CookedNotify, CookedPage, CookedSite, DomainResult, EntityStore,
    Notification, Page, Site, User, UserId,
};
use sha2::{Digest, Sha256};

/// Pure projection of a comment; `author` is `None` when the user row is gone.
pub fn cook_comment(comment: &Comment, author: Option<&User>) -> CookedComment {
    CookedComment {
        id: comment.id,
        content: comment.content.clone(),
        user_id: comment.user_id,
        nick: author.map(|u| u.name.clone()).unwrap_or_default(),
        email_hash: author.map(|u| email_hash(&u.email)).unwrap_or_default(),
        link: author.map(|u| u.link.clone()).unwrap_or_default(),
        is_admin: author.is_some_and(|u| u.is_admin),
        page_key: comment.page_key.clone(),
        site_name: comment.site_name.clone(),
        rid: comment.rid,
        is_pinned: comment.is_pinned,
        is_pending: comment.is_pending,
        is_collapsed: comment.is_collapsed,
        vote_up: comment.vote_up,
        vote_down: comment.vote_down,
        ua: comment.ua.clone(),
        date: format_date(comment.created_at),
        visible: true,
        ip_region: String::new(),
    }
}

pub fn cook_page(page: &Page) -> CookedPage {
    CookedPage {
        id: page.id,
        key: page.key.clone(),
        title: page.title.clone(),
        site_name: page.site_name.clone(),
        admin_only: page.admin_only,
        vote_up: page.vote_up,
        vote_down: page.vote_down,
        pv: page.pv,
    }
}

pub fn cook_notification(notification: &Notification) -> CookedNotify {
    CookedNotify {
        id: notification.id,
        user_id: notification.user_id,
        comment_id: notification.comment_id,
        is_read: notification.is_read,
        date: format_date(notification.created_at),
    }
}

pub fn cook_site(site: &Site) -> CookedSite {
    let urls: Vec<String> = site
        .urls
        .split(',')
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect();
    CookedSite {
        id: site.id,
        name: site.name.clone(),
        first_url: urls.first().cloned().unwrap_or_default(),
        urls,
    }
}

/// Hex SHA-256 of the trimmed, lowercased address.
pub fn email_hash(email: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.trim().to_lowercase().as_bytes());
    hex::encode(hasher.finalize())
}

fn format_date(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Per-request comment cooker. Remembers author lookups so a thread with
/// many replies from the same user costs one store round-trip per author.
pub struct Cooker<'a> {
    store: &'a dyn EntityStore,
    authors: HashMap<UserId, Option<User>>,
}

impl<'a> Cooker<'a> {
    pub fn new(store: &'a dyn EntityStore) -> Self {
        Self {
            store,
            authors: HashMap::new(),
        }
    }

    pub async fn comment(&mut self, comment: &Comment) -> DomainResult<CookedComment> {
        if !self.authors.contains_key(&comment.user_id) {
            let author = self.store.find_user_by_id(comment.user_id).await?;
            self.authors.insert(comment.user_id, author);
        }
        let author = self.authors.get(&comment.user_id).and_then(Option::as_ref);
        Ok(cook_comment(comment, author))
    }

    pub async fn comments(&mut self, comments: &[Comment]) -> DomainResult<Vec<CookedComment>> {
        let mut cooked = Vec::with_capacity(comments.len());
        for comment in comments {
            cooked.push(self.comment(comment).await?);
        }
        Ok(cooked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use domains::MockEntityStore;
    use mockall::predicate::eq;

    fn comment() -> Comment {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Comment {
            id: 7,
            content: "first!".into(),
            page_key: "/x.html".into(),
            site_name: "Site A".into(),
            user_id: 3,
            rid: 0,
            is_pinned: false,
            is_pending: false,
            is_collapsed: false,
            vote_up: 2,
            vote_down: 0,
            ip: "10.0.0.1".into(),
            ua: "curl".into(),
            created_at: at,
            updated_at: at,
        }
    }

    fn author() -> User {
        User {
            id: 3,
            name: "alice".into(),
            email: " Alice@Example.com ".into(),
            link: "https://alice.dev".into(),
            is_admin: true,
        }
    }

    #[test]
    fn test_cooking_twice_is_identical() {
        let c = comment();
        let a = author();
        assert_eq!(cook_comment(&c, Some(&a)), cook_comment(&c, Some(&a)));
    }

    #[test]
    fn test_cooked_comment_fields() {
        let cooked = cook_comment(&comment(), Some(&author()));
        assert_eq!(cooked.nick, "alice");
        assert!(cooked.is_admin);
        assert!(cooked.visible);
        assert!(cooked.ip_region.is_empty());
        assert_eq!(cooked.date, "2024-05-01T12:00:00Z");
        assert_eq!(cooked.email_hash, email_hash("alice@example.com"));
        assert_eq!(cooked.email_hash.len(), 64);
    }

    #[test]
    fn test_missing_author_cooks_anonymously() {
        let cooked = cook_comment(&comment(), None);
        assert!(cooked.nick.is_empty());
        assert!(!cooked.is_admin);
    }

    #[test]
    fn test_cook_site_splits_urls() {
        let site = Site {
            id: 1,
            name: "Site A".into(),
            urls: "http://localhost:8080/, ,https://qwqaq.com".into(),
        };
        let cooked = cook_site(&site);
        assert_eq!(cooked.urls, vec!["http://localhost:8080/", "https://qwqaq.com"]);
        assert_eq!(cooked.first_url, "http://localhost:8080/");
    }

    #[tokio::test]
    async fn test_cooker_fetches_each_author_once() {
        let mut store = MockEntityStore::new();
        store
            .expect_find_user_by_id()
            .with(eq(3))
            .times(1)
            .returning(|_| Ok(Some(author())));

        let mut cooker = Cooker::new(&store);
        let rows = vec![comment(), Comment { id: 8, ..comment() }];
        let cooked = cooker.comments(&rows).await.unwrap();
        assert_eq!(cooked.len(), 2);
        assert!(cooked.iter().all(|c| c.nick == "alice"));
    }
}
