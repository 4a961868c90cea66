use rusqlite::types::ToSql;

use crate::models::{PostRow, UserSummaryRow};
use crate::queries::{POST_SELECT, map_post};
use crate::{Database, Result};

/// LIKE pattern matching values that start with `text`, case-insensitively.
pub fn prefix_pattern(text: &str) -> String {
    format!("{}%", escape_like(text))
}

/// LIKE pattern matching values that contain `text`, case-insensitively.
pub fn contains_pattern(text: &str) -> String {
    format!("%{}%", escape_like(text))
}

fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// `(col1 LIKE ?n ESCAPE '\' OR col2 LIKE ?n ...) OR (...)` for every
/// pattern, numbering placeholders from 1.
fn any_match(columns: &[&str], patterns: usize) -> String {
    (1..=patterns)
        .flat_map(|i| {
            columns
                .iter()
                .map(move |col| format!("{col} LIKE ?{i} ESCAPE '\\'"))
        })
        .collect::<Vec<_>>()
        .join(" OR ")
}

impl Database {
    /// Users whose username, first name or last name matches any pattern.
    pub fn search_users(&self, patterns: &[String]) -> Result<Vec<UserSummaryRow>> {
        if patterns.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id, username, first_name, last_name, avatar FROM users
                 WHERE {} ORDER BY rowid",
                any_match(&["first_name", "last_name", "username"], patterns.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let values: Vec<&dyn ToSql> = patterns.iter().map(|p| p as &dyn ToSql).collect();
            let rows = stmt
                .query_map(values.as_slice(), |row| {
                    Ok(UserSummaryRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        first_name: row.get(2)?,
                        last_name: row.get(3)?,
                        avatar: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Posts whose title (and, if asked, content) matches any pattern.
    pub fn search_posts(&self, patterns: &[String], include_content: bool) -> Result<Vec<PostRow>> {
        if patterns.is_empty() {
            return Ok(vec![]);
        }

        let columns: &[&str] = if include_content {
            &["p.title", "p.content"]
        } else {
            &["p.title"]
        };

        self.with_conn(|conn| {
            let sql = format!(
                "{POST_SELECT} WHERE {} ORDER BY p.rowid",
                any_match(columns, patterns.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let values: Vec<&dyn ToSql> = patterns.iter().map(|p| p as &dyn ToSql).collect();
            let rows = stmt
                .query_map(values.as_slice(), map_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
