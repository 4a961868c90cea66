use rusqlite::params;

use crate::models::PostRow;
use crate::queries::{POST_SELECT, map_post};
use crate::{Database, Result};

/// Which posts a feed draws from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedFilter {
    All,
    Author(String),
    SavedBy(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOrder {
    /// Order of insertion (for saved posts: order of saving).
    Insertion,
    /// created_at descending.
    Newest,
    /// like count descending, insertion order among equals.
    MostLiked,
}

/// One page of a feed. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedPage {
    pub page: u32,
    pub limit: u32,
}

impl FeedPage {
    pub const SIZE: u32 = 10;

    /// Page number from an untrusted query value. Missing, garbage and
    /// zero all mean the first page.
    pub fn parse(raw: Option<&str>) -> Self {
        let page = raw
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);
        Self {
            page,
            limit: Self::SIZE,
        }
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }
}

impl Database {
    /// Selects, counts, sorts and paginates posts in a single query.
    pub fn feed(&self, filter: &FeedFilter, order: FeedOrder, page: FeedPage) -> Result<Vec<PostRow>> {
        let (join, condition, key) = match filter {
            FeedFilter::All => ("", "", None),
            FeedFilter::Author(id) => ("", "WHERE p.author_id = ?3", Some(id.as_str())),
            FeedFilter::SavedBy(id) => (
                "JOIN saves s ON s.post_id = p.id AND s.user_id = ?3",
                "",
                Some(id.as_str()),
            ),
        };

        let order_by = match (order, filter) {
            (FeedOrder::Newest, _) => "p.created_at DESC, p.rowid DESC",
            (FeedOrder::MostLiked, _) => "like_count DESC, p.rowid ASC",
            (FeedOrder::Insertion, FeedFilter::SavedBy(_)) => "s.rowid ASC",
            (FeedOrder::Insertion, _) => "p.rowid ASC",
        };

        let sql = format!(
            "{POST_SELECT} {join} {condition} ORDER BY {order_by} LIMIT ?1 OFFSET ?2"
        );

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let limit = i64::from(page.limit);
            let rows = match key {
                Some(key) => stmt.query_map(params![limit, page.offset(), key], map_post)?,
                None => stmt.query_map(params![limit, page.offset()], map_post)?,
            }
            .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
