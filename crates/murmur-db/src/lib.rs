pub mod feed;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod relations;
pub mod search;

use rusqlite::Connection;
use rusqlite::ffi;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub use feed::{FeedFilter, FeedOrder, FeedPage};
pub use relations::{RelationKind, Toggle};
pub use search::{contains_pattern, prefix_pattern};

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A UNIQUE or PRIMARY KEY constraint rejected the write.
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    /// A FOREIGN KEY constraint rejected the write: the referenced row is gone.
    #[error("Referenced row does not exist: {0}")]
    MissingReference(String),

    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("DB lock poisoned")]
    Poisoned,
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref code, ref msg) = err {
            let detail = msg.clone().unwrap_or_default();
            match code.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return DbError::Conflict(detail);
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return DbError::MissingReference(detail),
                _ => {}
            }
        }
        DbError::Sqlite(err)
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

/// The entity store. A single connection guarded by a mutex: SQLite
/// serialises writers anyway, and holding the lock across a toggle keeps
/// its insert/delete pair atomic with respect to other requests.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent readers from other processes
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn, &path.display().to_string())
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, ":memory:")
    }

    fn init(conn: Connection, label: &str) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        migrations::run(&conn)?;

        info!("Database opened at {}", label);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| DbError::Poisoned)?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| DbError::Poisoned)?;
        f(&mut conn)
    }
}

/// Current time in the stored text format: RFC 3339, UTC, microseconds.
/// Fixed width, so lexicographic order is chronological order.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
