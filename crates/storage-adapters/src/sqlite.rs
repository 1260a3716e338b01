//! # SQLite Implementation
//!
//! Maps the relational model onto the domain entities and translates
//! [`domains::CommentPredicate`]s into SQL `WHERE` clauses.

use std::str::FromStr;

use async_trait::async_trait;
use domains::{
    Comment, CommentId, CommentQuery, DomainError, DomainResult, EntityStore,
    Notification, Page, Pagination, Site, SiteId, SortBy, User, UserId,
};
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Row, Sqlite};
use tracing::info;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id       INTEGER PRIMARY KEY,
    name     TEXT    NOT NULL,
    email    TEXT    NOT NULL,
    link     TEXT    NOT NULL DEFAULT '',
    is_admin BOOLEAN NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS sites (
    id   INTEGER PRIMARY KEY,
    name TEXT    NOT NULL UNIQUE,
    urls TEXT    NOT NULL DEFAULT ''
);
CREATE TABLE IF NOT EXISTS pages (
    id         INTEGER PRIMARY KEY,
    page_key   TEXT    NOT NULL,
    title      TEXT    NOT NULL DEFAULT '',
    site_name  TEXT    NOT NULL,
    admin_only BOOLEAN NOT NULL DEFAULT 0,
    vote_up    INTEGER NOT NULL DEFAULT 0,
    vote_down  INTEGER NOT NULL DEFAULT 0,
    pv         INTEGER NOT NULL DEFAULT 0,
    UNIQUE (page_key, site_name)
);
CREATE TABLE IF NOT EXISTS comments (
    id           INTEGER PRIMARY KEY,
    content      TEXT    NOT NULL,
    page_key     TEXT    NOT NULL,
    site_name    TEXT    NOT NULL,
    user_id      INTEGER NOT NULL,
    rid          INTEGER NOT NULL DEFAULT 0,
    is_pinned    BOOLEAN NOT NULL DEFAULT 0,
    is_pending   BOOLEAN NOT NULL DEFAULT 0,
    is_collapsed BOOLEAN NOT NULL DEFAULT 0,
    vote_up      INTEGER NOT NULL DEFAULT 0,
    vote_down    INTEGER NOT NULL DEFAULT 0,
    ip           TEXT    NOT NULL DEFAULT '',
    ua           TEXT    NOT NULL DEFAULT '',
    created_at   TEXT    NOT NULL,
    updated_at   TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_comments_page ON comments (site_name, page_key);
CREATE INDEX IF NOT EXISTS idx_comments_rid ON comments (rid);
CREATE TABLE IF NOT EXISTS notifications (
    id         INTEGER PRIMARY KEY,
    user_id    INTEGER NOT NULL,
    comment_id INTEGER NOT NULL,
    is_read    BOOLEAN NOT NULL DEFAULT 0,
    created_at TEXT    NOT NULL
);
"#;

const COMMENT_COLUMNS: &str = "c.id, c.content, c.page_key, c.site_name, c.user_id, c.rid, \
    c.is_pinned, c.is_pending, c.is_collapsed, c.vote_up, c.vote_down, c.ip, c.ua, \
    c.created_at, c.updated_at";

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// A value bound to a `?` placeholder of a generated clause.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Bind {
    Int(i64),
    Text(String),
}

fn bind_all(mut query: SqliteQuery<'_>, binds: Vec<Bind>) -> SqliteQuery<'_> {
    for bind in binds {
        query = match bind {
            Bind::Int(v) => query.bind(v),
            Bind::Text(v) => query.bind(v),
        };
    }
    query
}

/// `%keyword%` with the LIKE metacharacters escaped by `\`.
fn like_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for ch in keyword.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Conjunction of all predicates over the `comments c` alias.
fn where_clause(query: &CommentQuery) -> (String, Vec<Bind>) {
    use domains::CommentPredicate as P;

    const REPLIES_TO: &str = "c.rid IN (SELECT p.id FROM comments p WHERE p.user_id = ?)";

    let mut clauses: Vec<String> = Vec::new();
    let mut binds = Vec::new();
    for predicate in &query.predicates {
        let clause = match predicate {
            P::PageKey(key) => {
                binds.push(Bind::Text(key.clone()));
                "c.page_key = ?".to_string()
            }
            P::SiteName(name) => {
                binds.push(Bind::Text(name.clone()));
                "c.site_name = ?".to_string()
            }
            P::RootOnly => "c.rid = 0".to_string(),
            P::PinnedOnly => "c.is_pinned = 1".to_string(),
            P::ExcludePinned => "c.is_pinned = 0".to_string(),
            P::Search(keyword) => {
                let exact = keyword.to_lowercase();
                binds.push(Bind::Text(like_pattern(keyword)));
                binds.push(Bind::Text(exact.clone()));
                binds.push(Bind::Text(exact));
                "(c.content LIKE ? ESCAPE '\\' OR c.user_id IN \
                 (SELECT u.id FROM users u WHERE LOWER(u.name) = ? OR LOWER(u.email) = ?))"
                    .to_string()
            }
            P::Approved { or_author: None } => "c.is_pending = 0".to_string(),
            P::Approved {
                or_author: Some(id),
            } => {
                binds.push(Bind::Int(*id as i64));
                "(c.is_pending = 0 OR c.user_id = ?)".to_string()
            }
            P::PendingOnly => "c.is_pending = 1".to_string(),
            P::AuthoredBy(id) => {
                binds.push(Bind::Int(*id as i64));
                "c.user_id = ?".to_string()
            }
            P::RepliesTo(id) => {
                binds.push(Bind::Int(*id as i64));
                REPLIES_TO.to_string()
            }
            P::AuthoredOrRepliesTo(id) => {
                binds.push(Bind::Int(*id as i64));
                binds.push(Bind::Int(*id as i64));
                format!("(c.user_id = ? OR {REPLIES_TO})")
            }
            P::AdminAuthorsOnly => {
                "c.user_id IN (SELECT u.id FROM users u WHERE u.is_admin = 1)".to_string()
            }
            P::Nothing => "0 = 1".to_string(),
        };
        clauses.push(clause);
    }

    if clauses.is_empty() {
        ("1 = 1".to_string(), binds)
    } else {
        (clauses.join(" AND "), binds)
    }
}

fn order_clause(sort: SortBy) -> &'static str {
    match sort {
        SortBy::DateAsc => "c.created_at ASC, c.id ASC",
        SortBy::DateDesc => "c.created_at DESC, c.id DESC",
        SortBy::Vote => "c.vote_up DESC, c.created_at DESC",
    }
}

fn comment_from_row(row: &SqliteRow) -> Result<Comment, sqlx::Error> {
    Ok(Comment {
        id: row.try_get::<i64, _>("id")? as u64,
        content: row.try_get("content")?,
        page_key: row.try_get("page_key")?,
        site_name: row.try_get("site_name")?,
        user_id: row.try_get::<i64, _>("user_id")? as u64,
        rid: row.try_get::<i64, _>("rid")? as u64,
        is_pinned: row.try_get("is_pinned")?,
        is_pending: row.try_get("is_pending")?,
        is_collapsed: row.try_get("is_collapsed")?,
        vote_up: row.try_get("vote_up")?,
        vote_down: row.try_get("vote_down")?,
        ip: row.try_get("ip")?,
        ua: row.try_get("ua")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn page_from_row(row: &SqliteRow) -> Result<Page, sqlx::Error> {
    Ok(Page {
        id: row.try_get::<i64, _>("id")? as u64,
        key: row.try_get("page_key")?,
        title: row.try_get("title")?,
        site_name: row.try_get("site_name")?,
        admin_only: row.try_get("admin_only")?,
        vote_up: row.try_get("vote_up")?,
        vote_down: row.try_get("vote_down")?,
        pv: row.try_get("pv")?,
    })
}

fn user_from_row(row: &SqliteRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get::<i64, _>("id")? as u64,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        link: row.try_get("link")?,
        is_admin: row.try_get("is_admin")?,
    })
}

fn notification_from_row(row: &SqliteRow) -> Result<Notification, sqlx::Error> {
    Ok(Notification {
        id: row.try_get::<i64, _>("id")? as u64,
        user_id: row.try_get::<i64, _>("user_id")? as u64,
        comment_id: row.try_get::<i64, _>("comment_id")? as u64,
        is_read: row.try_get("is_read")?,
        created_at: row.try_get("created_at")?,
    })
}

fn site_from_row(row: &SqliteRow) -> Result<Site, sqlx::Error> {
    Ok(Site {
        id: row.try_get::<i64, _>("id")? as u64,
        name: row.try_get("name")?,
        urls: row.try_get("urls")?,
    })
}

fn map_rows<T>(
    rows: &[SqliteRow],
    f: fn(&SqliteRow) -> Result<T, sqlx::Error>,
) -> DomainResult<Vec<T>> {
    rows.iter()
        .map(f)
        .collect::<Result<Vec<_>, _>>()
        .map_err(DomainError::store)
}

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if needed) the database and applies the schema.
    /// In-memory databases are pinned to a single connection so every
    /// query sees the same data.
    pub async fn connect(url: &str) -> DomainResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(DomainError::store)?
            .create_if_missing(true);
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(DomainError::store)?;

        let store = Self { pool };
        store.migrate().await?;
        info!(max_connections, "sqlite store ready");
        Ok(store)
    }

    pub async fn migrate(&self) -> DomainResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(DomainError::store)?;
        Ok(())
    }

    pub async fn insert_comment(&self, comment: &Comment) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO comments (id, content, page_key, site_name, user_id, rid, is_pinned, \
             is_pending, is_collapsed, vote_up, vote_down, ip, ua, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(comment.id as i64)
        .bind(&comment.content)
        .bind(&comment.page_key)
        .bind(&comment.site_name)
        .bind(comment.user_id as i64)
        .bind(comment.rid as i64)
        .bind(comment.is_pinned)
        .bind(comment.is_pending)
        .bind(comment.is_collapsed)
        .bind(comment.vote_up)
        .bind(comment.vote_down)
        .bind(&comment.ip)
        .bind(&comment.ua)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DomainError::store)?;
        Ok(())
    }

    pub async fn insert_page(&self, page: &Page) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO pages (id, page_key, title, site_name, admin_only, vote_up, vote_down, pv) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(page.id as i64)
        .bind(&page.key)
        .bind(&page.title)
        .bind(&page.site_name)
        .bind(page.admin_only)
        .bind(page.vote_up)
        .bind(page.vote_down)
        .bind(page.pv)
        .execute(&self.pool)
        .await
        .map_err(DomainError::store)?;
        Ok(())
    }

    pub async fn insert_user(&self, user: &User) -> DomainResult<()> {
        sqlx::query("INSERT INTO users (id, name, email, link, is_admin) VALUES (?, ?, ?, ?, ?)")
            .bind(user.id as i64)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.link)
            .bind(user.is_admin)
            .execute(&self.pool)
            .await
            .map_err(DomainError::store)?;
        Ok(())
    }

    pub async fn insert_site(&self, site: &Site) -> DomainResult<()> {
        sqlx::query("INSERT INTO sites (id, name, urls) VALUES (?, ?, ?)")
            .bind(site.id as i64)
            .bind(&site.name)
            .bind(&site.urls)
            .execute(&self.pool)
            .await
            .map_err(|err| match err {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    DomainError::Conflict(format!("site `{}` already exists", site.name))
                }
                other => DomainError::store(other),
            })?;
        Ok(())
    }

    pub async fn insert_notification(&self, notification: &Notification) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, comment_id, is_read, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(notification.id as i64)
        .bind(notification.user_id as i64)
        .bind(notification.comment_id as i64)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(DomainError::store)?;
        Ok(())
    }
}

#[async_trait]
impl EntityStore for SqliteStore {
    async fn find_comments(
        &self,
        query: &CommentQuery,
        pagination: Pagination,
    ) -> DomainResult<Vec<Comment>> {
        let (clause, binds) = where_clause(query);
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c WHERE {clause} ORDER BY {} LIMIT ? OFFSET ?",
            order_clause(query.sort)
        );
        let rows = bind_all(sqlx::query(&sql), binds)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(DomainError::store)?;
        map_rows(&rows, comment_from_row)
    }

    async fn count_comments(&self, query: &CommentQuery) -> DomainResult<i64> {
        let (clause, binds) = where_clause(query);
        let sql = format!("SELECT COUNT(*) FROM comments c WHERE {clause}");
        let row = bind_all(sqlx::query(&sql), binds)
            .fetch_one(&self.pool)
            .await
            .map_err(DomainError::store)?;
        row.try_get::<i64, _>(0).map_err(DomainError::store)
    }

    async fn find_comment(&self, id: CommentId) -> DomainResult<Option<Comment>> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments c WHERE c.id = ?");
        let row = sqlx::query(&sql)
            .bind(id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(DomainError::store)?;
        row.as_ref()
            .map(comment_from_row)
            .transpose()
            .map_err(DomainError::store)
    }

    async fn find_comment_children(&self, parent_id: CommentId) -> DomainResult<Vec<Comment>> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c WHERE c.rid = ? AND c.rid != 0 \
             ORDER BY c.created_at ASC, c.id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(parent_id as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(DomainError::store)?;
        map_rows(&rows, comment_from_row)
    }

    async fn find_page(&self, key: &str, site_name: &str) -> DomainResult<Option<Page>> {
        let row = sqlx::query("SELECT * FROM pages WHERE page_key = ? AND site_name = ?")
            .bind(key)
            .bind(site_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(DomainError::store)?;
        row.as_ref()
            .map(page_from_row)
            .transpose()
            .map_err(DomainError::store)
    }

    async fn list_pages(&self) -> DomainResult<Vec<Page>> {
        let rows = sqlx::query("SELECT * FROM pages ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(DomainError::store)?;
        map_rows(&rows, page_from_row)
    }

    async fn find_user(&self, name: &str, email: &str) -> DomainResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE name = ? AND email = ?")
            .bind(name)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(DomainError::store)?;
        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(DomainError::store)
    }

    async fn find_user_by_id(&self, id: UserId) -> DomainResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(DomainError::store)?;
        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(DomainError::store)
    }

    async fn list_users(&self) -> DomainResult<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(DomainError::store)?;
        map_rows(&rows, user_from_row)
    }

    async fn find_unread_notifications(&self, user_id: UserId) -> DomainResult<Vec<Notification>> {
        let rows = sqlx::query(
            "SELECT * FROM notifications WHERE user_id = ? AND is_read = 0 \
             ORDER BY created_at ASC, id ASC",
        )
        .bind(user_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(DomainError::store)?;
        map_rows(&rows, notification_from_row)
    }

    async fn mark_all_notifications_read(&self, user_id: UserId) -> DomainResult<()> {
        sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
            .bind(user_id as i64)
            .execute(&self.pool)
            .await
            .map_err(DomainError::store)?;
        Ok(())
    }

    async fn find_all_sites(&self) -> DomainResult<Vec<Site>> {
        let rows = sqlx::query("SELECT * FROM sites ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(DomainError::store)?;
        map_rows(&rows, site_from_row)
    }

    async fn find_site_by_id(&self, id: SiteId) -> DomainResult<Option<Site>> {
        let row = sqlx::query("SELECT * FROM sites WHERE id = ?")
            .bind(id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(DomainError::store)?;
        row.as_ref()
            .map(site_from_row)
            .transpose()
            .map_err(DomainError::store)
    }

    /// Site, pages and comments go in one transaction so a failure never
    /// leaves orphaned pages behind.
    async fn delete_site(&self, site: &Site) -> DomainResult<()> {
        let mut tx = self.pool.begin().await.map_err(DomainError::store)?;

        sqlx::query("DELETE FROM comments WHERE site_name = ?")
            .bind(&site.name)
            .execute(&mut *tx)
            .await
            .map_err(DomainError::store)?;
        sqlx::query("DELETE FROM pages WHERE site_name = ?")
            .bind(&site.name)
            .execute(&mut *tx)
            .await
            .map_err(DomainError::store)?;
        sqlx::query("DELETE FROM sites WHERE id = ?")
            .bind(site.id as i64)
            .execute(&mut *tx)
            .await
            .map_err(DomainError::store)?;

        tx.commit().await.map_err(DomainError::store)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use domains::CommentPredicate as P;

    #[test]
    fn test_where_clause_binds_in_order() {
        let query = CommentQuery::new(vec![
            P::SiteName("Site A".into()),
            P::PageKey("/x.html".into()),
            P::Approved { or_author: Some(4) },
            P::RootOnly,
            P::Search("rust".into()),
        ]);
        let (clause, binds) = where_clause(&query);
        assert_eq!(clause.matches('?').count(), binds.len());
        assert!(clause.starts_with("c.site_name = ? AND c.page_key = ?"));
        assert!(clause.contains("c.rid = 0"));
        assert_eq!(binds[0], Bind::Text("Site A".into()));
        assert_eq!(binds[2], Bind::Int(4));
        assert_eq!(binds[3], Bind::Text("%rust%".into()));
        assert_eq!(binds[4], Bind::Text("rust".into()));
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
        assert_eq!(like_pattern("plain"), "%plain%");
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let (clause, binds) = where_clause(&CommentQuery::default());
        assert_eq!(clause, "1 = 1");
        assert!(binds.is_empty());
    }

    #[test]
    fn test_replies_to_binds_user() {
        let query = CommentQuery::new(vec![P::AuthoredOrRepliesTo(3)]);
        let (clause, binds) = where_clause(&query);
        assert_eq!(clause.matches('?').count(), 2);
        assert_eq!(binds, vec![Bind::Int(3), Bind::Int(3)]);
    }

    fn comment(id: u64, rid: u64, user_id: u64) -> Comment {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(id as i64);
        Comment {
            id,
            content: format!("comment {id}"),
            page_key: "/x.html".into(),
            site_name: "Site A".into(),
            user_id,
            rid,
            is_pinned: false,
            is_pending: false,
            is_collapsed: false,
            vote_up: 0,
            vote_down: 0,
            ip: "127.0.0.1".into(),
            ua: String::new(),
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn test_queries_against_memory_database() {
        let store = SqliteStore::connect("sqlite::memory:")
            .await
            .expect("Failed to open SQLite");

        for (id, name) in [(1, "alice"), (2, "bob")] {
            store
                .insert_user(&User {
                    id,
                    name: name.into(),
                    email: format!("{name}@example.com"),
                    link: String::new(),
                    is_admin: id == 1,
                })
                .await
                .unwrap();
        }
        for c in [comment(1, 0, 1), comment(2, 1, 2), comment(3, 0, 2)] {
            store.insert_comment(&c).await.unwrap();
        }
        store
            .insert_site(&Site {
                id: 1,
                name: "Site A".into(),
                urls: "https://a.com".into(),
            })
            .await
            .unwrap();

        let roots = CommentQuery::new(vec![P::RootOnly]).sorted(SortBy::DateAsc);
        let rows = store
            .find_comments(&roots, Pagination::new(0, 10, 100))
            .await
            .unwrap();
        assert_eq!(rows.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(rows[0], comment(1, 0, 1));

        let replies = CommentQuery::new(vec![P::RepliesTo(1)]);
        assert_eq!(store.count_comments(&replies).await.unwrap(), 1);

        let children = store.find_comment_children(1).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, 2);

        let user = store.find_user("bob", "bob@example.com").await.unwrap();
        assert_eq!(user.map(|u| u.id), Some(2));

        let site = store.find_site_by_id(1).await.unwrap().unwrap();
        store.delete_site(&site).await.unwrap();
        assert_eq!(store.count_comments(&CommentQuery::default()).await.unwrap(), 0);
        assert!(store.find_all_sites().await.unwrap().is_empty());
    }
}
