use crate::models::{
    AvatarRow, CommentRow, NewPost, PostEdit, PostRow, ProfileUpdate, ReportRow, UserRow,
};
use crate::{Database, DbError, Result, now_timestamp};
use rusqlite::{Connection, Row, params};
use tracing::info;

/// Post columns plus correlated like/comment counts. Callers alias the
/// posts table as `p` and append their own joins, filters and ordering.
pub(crate) const POST_SELECT: &str = "SELECT p.id, p.author_id, p.author, p.author_avatar, p.title, p.subtitle,
        p.content, p.image, p.video, p.is_edited, p.created_at, p.updated_at,
        (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS like_count,
        (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count
     FROM posts p";

pub(crate) fn map_post(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author: row.get(2)?,
        author_avatar: row.get(3)?,
        title: row.get(4)?,
        subtitle: row.get(5)?,
        content: row.get(6)?,
        image: row.get(7)?,
        video: row.get(8)?,
        is_edited: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        like_count: row.get(12)?,
        comment_count: row.get(13)?,
    })
}

const USER_COLUMNS: &str = "id, username, email, password, first_name, last_name, bio, birthday,
        avatar, is_verified, last_login, created_at, updated_at";

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        first_name: row.get(4)?,
        last_name: row.get(5)?,
        bio: row.get(6)?,
        birthday: row.get(7)?,
        avatar: row.get(8)?,
        is_verified: row.get(9)?,
        last_login: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

const COMMENT_COLUMNS: &str =
    "id, post_id, user_id, username, user_avatar, content, is_edited, created_at, updated_at";

fn map_comment(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        user_id: row.get(2)?,
        username: row.get(3)?,
        user_avatar: row.get(4)?,
        content: row.get(5)?,
        is_edited: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

const REPORT_SELECT: &str = "SELECT r.id, r.reporter_id, r.target_id, r.target_type, r.reason, r.description,
        r.status,
        CASE r.target_type
            WHEN 'User' THEN EXISTS(SELECT 1 FROM users u WHERE u.id = r.target_id)
            ELSE EXISTS(SELECT 1 FROM posts p WHERE p.id = r.target_id)
        END AS target_exists,
        r.created_at, r.updated_at
     FROM reports r";

fn map_report(row: &Row<'_>) -> rusqlite::Result<ReportRow> {
    Ok(ReportRow {
        id: row.get(0)?,
        reporter_id: row.get(1)?,
        target_id: row.get(2)?,
        target_type: row.get(3)?,
        reason: row.get(4)?,
        description: row.get(5)?,
        status: row.get(6)?,
        target_exists: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

impl Database {
    // -- Users --

    /// Inserts a new account. A taken email or username surfaces as
    /// `DbError::Conflict` from the UNIQUE constraints.
    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        username: Option<&str>,
        password_hash: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let now = now_timestamp();
            conn.execute(
                "INSERT INTO users (id, email, username, password, last_login, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?5)",
                params![id, email, username, password_hash, now],
            )?;
            info!("Created user {}", id);
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn user_exists(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
                [id],
                |row| row.get(0),
            )?)
        })
    }

    pub fn touch_last_login(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET last_login = ?2 WHERE id = ?1",
                params![id, now_timestamp()],
            )?;
            Ok(())
        })
    }

    /// Applies a profile setup. Bio is only overwritten when given; the
    /// account is marked verified. Returns false if the user is gone.
    pub fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users
                 SET avatar = ?2, first_name = ?3, last_name = ?4, username = ?5,
                     bio = COALESCE(?6, bio), birthday = ?7, is_verified = 1, updated_at = ?8
                 WHERE id = ?1",
                params![
                    id,
                    update.avatar,
                    update.first_name,
                    update.last_name,
                    update.username,
                    update.bio,
                    update.birthday,
                    now_timestamp(),
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_user_avatar(&self, id: &str, avatar_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET avatar = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, avatar_id, now_timestamp()],
            )?;
            Ok(changed > 0)
        })
    }

    /// (total posts, followers, following) for a profile page.
    pub fn user_stats(&self, id: &str) -> Result<(i64, i64, i64)> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM posts WHERE author_id = ?1),
                    (SELECT COUNT(*) FROM follows WHERE following_id = ?1),
                    (SELECT COUNT(*) FROM follows WHERE follower_id = ?1)",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?)
        })
    }

    // -- Avatars --

    pub fn list_avatars(&self) -> Result<Vec<AvatarRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, url, label FROM avatars ORDER BY id")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(AvatarRow {
                        id: row.get(0)?,
                        url: row.get(1)?,
                        label: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_avatar(&self, id: &str) -> Result<Option<AvatarRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, url, label FROM avatars WHERE id = ?1",
                [id],
                |row| {
                    Ok(AvatarRow {
                        id: row.get(0)?,
                        url: row.get(1)?,
                        label: row.get(2)?,
                    })
                },
            )
            .optional()
        })
    }

    // -- Posts --

    pub fn create_post(&self, post: &NewPost) -> Result<PostRow> {
        self.with_conn(|conn| {
            let now = now_timestamp();
            conn.execute(
                "INSERT INTO posts (id, author_id, author, author_avatar, title, subtitle, content,
                                    image, video, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                params![
                    post.id,
                    post.author_id,
                    post.author,
                    post.author_avatar,
                    post.title,
                    post.subtitle,
                    post.content,
                    post.image,
                    post.video,
                    now,
                ],
            )?;
            query_post(conn, &post.id)?
                .ok_or_else(|| DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| query_post(conn, id))
    }

    /// Applies the given fields and marks the post edited. Returns the
    /// updated post, or None if it does not exist.
    pub fn edit_post(&self, id: &str, edit: &PostEdit) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE posts
                 SET title = COALESCE(?2, title), subtitle = COALESCE(?3, subtitle),
                     content = COALESCE(?4, content), image = COALESCE(?5, image),
                     video = COALESCE(?6, video), is_edited = 1, updated_at = ?7
                 WHERE id = ?1",
                params![
                    id,
                    edit.title,
                    edit.subtitle,
                    edit.content,
                    edit.image,
                    edit.video,
                    now_timestamp(),
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_post(conn, id)
        })
    }

    /// Deletes a post with its likes, comments and saves in one
    /// transaction. Reports naming the post are left in place.
    pub fn delete_post(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM likes WHERE post_id = ?1", [id])?;
            tx.execute("DELETE FROM comments WHERE post_id = ?1", [id])?;
            tx.execute("DELETE FROM saves WHERE post_id = ?1", [id])?;
            let deleted = tx.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            tx.commit()?;
            if deleted > 0 {
                info!("Deleted post {} and its dependents", id);
            }
            Ok(deleted > 0)
        })
    }

    // -- Comments --

    pub fn create_comment(&self, comment: &CommentRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, post_id, user_id, username, user_avatar, content,
                                       is_edited, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    comment.id,
                    comment.post_id,
                    comment.user_id,
                    comment.username,
                    comment.user_avatar,
                    comment.content,
                    comment.is_edited,
                    comment.created_at,
                    comment.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"),
                [id],
                map_comment,
            )
            .optional()
        })
    }

    /// Comments on a post, newest first.
    pub fn list_comments(&self, post_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = ?1
                 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt
                .query_map([post_id], map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn edit_comment(&self, id: &str, content: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE comments SET content = ?2, is_edited = 1, updated_at = ?3 WHERE id = ?1",
                params![id, content, now_timestamp()],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            conn.query_row(
                &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"),
                [id],
                map_comment,
            )
            .optional()
        })
    }

    pub fn delete_comment(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM comments WHERE id = ?1", [id])? > 0))
    }

    // -- Reports --

    /// Files a report. A second report by the same reporter against the
    /// same target is a `DbError::Conflict`.
    pub fn create_report(
        &self,
        id: &str,
        reporter_id: &str,
        target_id: &str,
        target_type: &str,
        reason: &str,
        description: Option<&str>,
    ) -> Result<ReportRow> {
        self.with_conn(|conn| {
            let now = now_timestamp();
            conn.execute(
                "INSERT INTO reports (id, reporter_id, target_id, target_type, reason, description,
                                      created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![id, reporter_id, target_id, target_type, reason, description, now],
            )?;
            query_report(conn, id)?
                .ok_or_else(|| DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
        })
    }

    /// All reports, newest first.
    pub fn list_reports(&self) -> Result<Vec<ReportRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("{REPORT_SELECT} ORDER BY r.created_at DESC, r.rowid DESC"))?;
            let rows = stmt
                .query_map([], map_report)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_report_status(&self, id: &str, status: &str) -> Result<Option<ReportRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE reports SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, status, now_timestamp()],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_report(conn, id)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"),
        [value],
        map_user,
    )
    .optional()
}

pub(crate) fn query_post(conn: &Connection, id: &str) -> Result<Option<PostRow>> {
    conn.query_row(&format!("{POST_SELECT} WHERE p.id = ?1"), [id], map_post)
        .optional()
}

fn query_report(conn: &Connection, id: &str) -> Result<Option<ReportRow>> {
    conn.query_row(&format!("{REPORT_SELECT} WHERE r.id = ?1"), [id], map_report)
        .optional()
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::new_id;

    pub(crate) fn seed_user(db: &Database, name: &str) -> String {
        let id = new_id();
        db.create_user(&id, &format!("{name}@example.com"), Some(name), "hash")
            .unwrap();
        id
    }

    pub(crate) fn seed_post(db: &Database, author_id: &str, title: &str) -> PostRow {
        db.create_post(&NewPost {
            id: new_id(),
            author_id: author_id.to_string(),
            author: None,
            author_avatar: None,
            title: title.to_string(),
            subtitle: None,
            content: format!("{title} body"),
            image: None,
            video: None,
        })
        .unwrap()
    }

    pub(crate) fn seed_comment(db: &Database, post_id: &str, user_id: &str, content: &str) -> String {
        let id = new_id();
        let now = now_timestamp();
        db.create_comment(&CommentRow {
            id: id.clone(),
            post_id: post_id.to_string(),
            user_id: user_id.to_string(),
            username: None,
            user_avatar: None,
            content: content.to_string(),
            is_edited: false,
            created_at: now.clone(),
            updated_at: now,
        })
        .unwrap();
        id
    }

    #[test]
    fn new_post_has_zero_counts() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let post = seed_post(&db, &alice, "hello");
        assert_eq!(post.like_count, 0);
        assert_eq!(post.comment_count, 0);
        assert!(!post.is_edited);
    }

    #[test]
    fn post_requires_existing_author() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .create_post(&NewPost {
                id: new_id(),
                author_id: "ghost".into(),
                author: None,
                author_avatar: None,
                title: "t".into(),
                subtitle: None,
                content: "c".into(),
                image: None,
                video: None,
            })
            .unwrap_err();
        assert!(matches!(err, DbError::MissingReference(_)));
    }

    #[test]
    fn edit_post_keeps_unset_fields_and_flags_edit() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let post = seed_post(&db, &alice, "first");

        let edited = db
            .edit_post(
                &post.id,
                &PostEdit {
                    title: Some("second".into()),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(edited.title, "second");
        assert_eq!(edited.content, "first body");
        assert_eq!(edited.author_id, alice);
        assert!(edited.is_edited);
        assert!(db.edit_post("missing", &PostEdit::default()).unwrap().is_none());
    }

    #[test]
    fn delete_post_cascades_to_likes_comments_and_saves() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let post = seed_post(&db, &alice, "doomed");
        let other = seed_post(&db, &alice, "survivor");

        db.create_relation(crate::RelationKind::Like, &bob, &post.id).unwrap();
        db.create_relation(crate::RelationKind::Save, &bob, &post.id).unwrap();
        db.create_relation(crate::RelationKind::Like, &bob, &other.id).unwrap();
        seed_comment(&db, &post.id, &bob, "nice");
        db.create_report(&new_id(), &bob, &post.id, "Post", "spam", None)
            .unwrap();

        assert!(db.delete_post(&post.id).unwrap());
        assert!(db.get_post(&post.id).unwrap().is_none());
        assert!(db.list_comments(&post.id).unwrap().is_empty());

        let (likes, saves): (i64, i64) = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT (SELECT COUNT(*) FROM likes WHERE post_id = ?1),
                            (SELECT COUNT(*) FROM saves WHERE post_id = ?1)",
                    [&post.id],
                    |r| Ok((r.get(0)?, r.get(1)?)),
                )?)
            })
            .unwrap();
        assert_eq!((likes, saves), (0, 0));

        // Unrelated post untouched, report kept but marked dangling
        assert_eq!(db.get_post(&other.id).unwrap().unwrap().like_count, 1);
        let reports = db.list_reports().unwrap();
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].target_exists);

        assert!(!db.delete_post(&post.id).unwrap());
    }

    #[test]
    fn comments_list_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let post = seed_post(&db, &alice, "p");
        seed_comment(&db, &post.id, &alice, "one");
        seed_comment(&db, &post.id, &alice, "two");

        let contents: Vec<String> = db
            .list_comments(&post.id)
            .unwrap()
            .into_iter()
            .map(|c| c.content)
            .collect();
        assert_eq!(contents, vec!["two", "one"]);
        assert_eq!(db.get_post(&post.id).unwrap().unwrap().comment_count, 2);
    }

    #[test]
    fn duplicate_report_conflicts_and_status_is_free_form() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");

        let report = db
            .create_report(&new_id(), &alice, &bob, "User", "rude", Some("details"))
            .unwrap();
        assert_eq!(report.status, "Pending");
        assert!(report.target_exists);

        let err = db
            .create_report(&new_id(), &alice, &bob, "User", "again", None)
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));

        let resolved = db.update_report_status(&report.id, "Resolved").unwrap().unwrap();
        assert_eq!(resolved.status, "Resolved");
        let back = db.update_report_status(&report.id, "Pending").unwrap().unwrap();
        assert_eq!(back.status, "Pending");
        assert!(db.update_report_status("missing", "Pending").unwrap().is_none());
    }

    #[test]
    fn profile_update_keeps_bio_when_absent() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");

        db.update_profile(
            &alice,
            &ProfileUpdate {
                username: Some("alice".into()),
                bio: Some("hi".into()),
                ..Default::default()
            },
        )
        .unwrap();
        db.update_profile(
            &alice,
            &ProfileUpdate {
                username: Some("alice2".into()),
                first_name: Some("Alice".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let user = db.get_user_by_id(&alice).unwrap().unwrap();
        assert_eq!(user.username.as_deref(), Some("alice2"));
        assert_eq!(user.bio.as_deref(), Some("hi"));
        assert!(user.is_verified);
    }

    #[test]
    fn user_stats_count_posts_and_follows() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        seed_post(&db, &alice, "a");
        seed_post(&db, &alice, "b");
        db.create_relation(crate::RelationKind::Follow, &bob, &alice).unwrap();

        assert_eq!(db.user_stats(&alice).unwrap(), (2, 1, 0));
        assert_eq!(db.user_stats(&bob).unwrap(), (0, 0, 1));
    }
}
