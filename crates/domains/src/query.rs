//! Store-agnostic comment query vocabulary.
//!
//! Services describe *what* rows they want as an ordered list of
//! [`CommentPredicate`]s combined conjunctively; each storage adapter
//! translates them into its own query language.

use crate::models::UserId;

/// Which site(s) a request is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteScope {
    /// Admin-only view across every site
    All,
    Only(String),
}

impl SiteScope {
    pub fn site_name(&self) -> Option<&str> {
        match self {
            SiteScope::All => None,
            SiteScope::Only(name) => Some(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    DateAsc,
    #[default]
    DateDesc,
    /// Most up-voted first, newest first among ties
    Vote,
}

impl SortBy {
    /// Unknown values fall back to the default ordering.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "date_asc" => SortBy::DateAsc,
            "vote" => SortBy::Vote,
            _ => SortBy::DateDesc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentPredicate {
    PageKey(String),
    SiteName(String),
    /// `rid == 0`
    RootOnly,
    PinnedOnly,
    ExcludePinned,
    /// Case-insensitive keyword match on content and author
    Search(String),
    /// Not pending, or pending but written by the given user
    Approved { or_author: Option<UserId> },
    PendingOnly,
    AuthoredBy(UserId),
    /// Replies whose parent comment was written by the given user
    RepliesTo(UserId),
    AuthoredOrRepliesTo(UserId),
    /// Comments whose author is an admin
    AdminAuthorsOnly,
    /// Matches no row at all
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommentQuery {
    pub predicates: Vec<CommentPredicate>,
    pub sort: SortBy,
}

impl CommentQuery {
    pub fn new(predicates: Vec<CommentPredicate>) -> Self {
        Self {
            predicates,
            sort: SortBy::default(),
        }
    }

    /// Adds a restriction unless an identical one is already present.
    pub fn with(mut self, predicate: CommentPredicate) -> Self {
        if !self.has(&predicate) {
            self.predicates.push(predicate);
        }
        self
    }

    pub fn sorted(mut self, sort: SortBy) -> Self {
        self.sort = sort;
        self
    }

    pub fn has(&self, predicate: &CommentPredicate) -> bool {
        self.predicates.contains(predicate)
    }
}

/// Offset/limit window for the primary comment query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    offset: i64,
    limit: i64,
}

impl Pagination {
    pub const DEFAULT_MAX_LIMIT: i64 = 100;

    /// Negative offsets clamp to zero; a missing, zero or oversized limit
    /// becomes `max_limit`.
    pub fn new(offset: i64, limit: i64, max_limit: i64) -> Self {
        let max_limit = if max_limit > 0 {
            max_limit
        } else {
            Self::DEFAULT_MAX_LIMIT
        };
        let limit = if limit <= 0 || limit > max_limit {
            max_limit
        } else {
            limit
        };
        Self {
            offset: offset.max(0),
            limit,
        }
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn is_first_page(&self) -> bool {
        self.offset == 0
    }
}
