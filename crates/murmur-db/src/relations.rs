use std::collections::HashSet;

use rusqlite::{Connection, params};
use tracing::debug;

use crate::models::{FollowRow, UserSummaryRow};
use crate::{Database, DbError, Result, new_id, now_timestamp};

/// Bound parameters per `related_targets` query, well under SQLite's
/// variable limit. Search results are unpaginated and can be large.
const RELATED_CHUNK: usize = 500;

/// The three actor→target edges with at-most-one-per-pair cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// user → post
    Like,
    /// user → post
    Save,
    /// user → user
    Follow,
}

impl RelationKind {
    fn table(self) -> &'static str {
        match self {
            RelationKind::Like => "likes",
            RelationKind::Save => "saves",
            RelationKind::Follow => "follows",
        }
    }

    fn actor_column(self) -> &'static str {
        match self {
            RelationKind::Like | RelationKind::Save => "user_id",
            RelationKind::Follow => "follower_id",
        }
    }

    fn target_column(self) -> &'static str {
        match self {
            RelationKind::Like | RelationKind::Save => "post_id",
            RelationKind::Follow => "following_id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Created,
    Deleted,
}

impl Database {
    /// Inserts the edge. An existing edge is reported as `DbError::Conflict`
    /// by the table's UNIQUE constraint, a missing target as
    /// `DbError::MissingReference`.
    pub fn create_relation(&self, kind: RelationKind, actor: &str, target: &str) -> Result<()> {
        self.with_conn(|conn| insert_relation(conn, kind, actor, target))
    }

    /// Removes the edge. Returns false if there was none.
    pub fn remove_relation(&self, kind: RelationKind, actor: &str, target: &str) -> Result<bool> {
        self.with_conn(|conn| delete_relation(conn, kind, actor, target))
    }

    /// Creates the edge if absent, deletes it if present.
    ///
    /// Insert-first: the UNIQUE constraint, not a prior read, decides
    /// whether the edge already exists. Both steps run under the
    /// connection lock so two concurrent toggles cannot interleave.
    pub fn toggle_relation(&self, kind: RelationKind, actor: &str, target: &str) -> Result<Toggle> {
        self.with_conn(|conn| match insert_relation(conn, kind, actor, target) {
            Ok(()) => Ok(Toggle::Created),
            Err(DbError::Conflict(_)) => {
                delete_relation(conn, kind, actor, target)?;
                Ok(Toggle::Deleted)
            }
            Err(e) => Err(e),
        })
        .inspect(|outcome| debug!(?kind, actor, target, ?outcome, "Toggled relation"))
    }

    pub fn relation_exists(&self, kind: RelationKind, actor: &str, target: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1 AND {} = ?2)",
                kind.table(),
                kind.actor_column(),
                kind.target_column()
            );
            Ok(conn.query_row(&sql, params![actor, target], |row| row.get(0))?)
        })
    }

    /// Which of `targets` the actor has an edge to. One query per
    /// `RELATED_CHUNK` targets instead of one per post.
    pub fn related_targets(
        &self,
        kind: RelationKind,
        actor: &str,
        targets: &[String],
    ) -> Result<HashSet<String>> {
        if targets.is_empty() {
            return Ok(HashSet::new());
        }

        self.with_conn(|conn| {
            let mut found = HashSet::new();
            for chunk in targets.chunks(RELATED_CHUNK) {
                let placeholders: Vec<String> = (2..=chunk.len() + 1).map(|i| format!("?{}", i)).collect();
                let sql = format!(
                    "SELECT {target} FROM {table} WHERE {actor} = ?1 AND {target} IN ({list})",
                    target = kind.target_column(),
                    table = kind.table(),
                    actor = kind.actor_column(),
                    list = placeholders.join(", ")
                );

                let mut stmt = conn.prepare_cached(&sql)?;
                let mut values: Vec<&dyn rusqlite::types::ToSql> = Vec::with_capacity(chunk.len() + 1);
                values.push(&actor);
                values.extend(chunk.iter().map(|id| id as &dyn rusqlite::types::ToSql));

                for id in stmt.query_map(values.as_slice(), |row| row.get::<_, String>(0))? {
                    found.insert(id?);
                }
            }
            Ok(found)
        })
    }

    /// Users following `user_id`, most recent follow first.
    pub fn list_followers(&self, user_id: &str) -> Result<Vec<FollowRow>> {
        self.with_conn(|conn| query_follow_edges(conn, user_id, "following_id", "follower_id"))
    }

    /// Users `user_id` follows, most recent follow first.
    pub fn list_following(&self, user_id: &str) -> Result<Vec<FollowRow>> {
        self.with_conn(|conn| query_follow_edges(conn, user_id, "follower_id", "following_id"))
    }
}

fn insert_relation(conn: &Connection, kind: RelationKind, actor: &str, target: &str) -> Result<()> {
    let sql = format!(
        "INSERT INTO {} (id, {}, {}, created_at) VALUES (?1, ?2, ?3, ?4)",
        kind.table(),
        kind.actor_column(),
        kind.target_column()
    );
    conn.execute(&sql, params![new_id(), actor, target, now_timestamp()])?;
    Ok(())
}

fn delete_relation(conn: &Connection, kind: RelationKind, actor: &str, target: &str) -> Result<bool> {
    let sql = format!(
        "DELETE FROM {} WHERE {} = ?1 AND {} = ?2",
        kind.table(),
        kind.actor_column(),
        kind.target_column()
    );
    Ok(conn.execute(&sql, params![actor, target])? > 0)
}

/// Follow edges anchored on `anchor_column = user_id`, joined to the user
/// on the other end. Edges whose other user has vanished are dropped.
fn query_follow_edges(
    conn: &Connection,
    user_id: &str,
    anchor_column: &str,
    other_column: &str,
) -> Result<Vec<FollowRow>> {
    let sql = format!(
        "SELECT u.id, u.username, u.first_name, u.last_name, u.avatar, f.created_at
         FROM follows f
         JOIN users u ON u.id = f.{other_column}
         WHERE f.{anchor_column} = ?1
         ORDER BY f.created_at DESC, f.rowid DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([user_id], |row| {
            Ok(FollowRow {
                user: UserSummaryRow {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    first_name: row.get(2)?,
                    last_name: row.get(3)?,
                    avatar: row.get(4)?,
                },
                followed_at: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::tests::{seed_post, seed_user};
    use std::sync::Arc;

    fn count(db: &Database, kind: RelationKind, actor: &str, target: &str) -> i64 {
        db.with_conn(|conn| {
            let sql = format!(
                "SELECT COUNT(*) FROM {} WHERE {} = ?1 AND {} = ?2",
                kind.table(),
                kind.actor_column(),
                kind.target_column()
            );
            Ok(conn.query_row(&sql, params![actor, target], |r| r.get(0))?)
        })
        .unwrap()
    }

    #[test]
    fn toggle_alternates_and_like_count_follows() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let post = seed_post(&db, &alice, "p1");

        assert_eq!(db.toggle_relation(RelationKind::Like, &bob, &post.id).unwrap(), Toggle::Created);
        assert_eq!(db.get_post(&post.id).unwrap().unwrap().like_count, 1);

        assert_eq!(db.toggle_relation(RelationKind::Like, &bob, &post.id).unwrap(), Toggle::Deleted);
        assert_eq!(db.get_post(&post.id).unwrap().unwrap().like_count, 0);

        for i in 0..6 {
            let expected = if i % 2 == 0 { Toggle::Created } else { Toggle::Deleted };
            assert_eq!(db.toggle_relation(RelationKind::Save, &bob, &post.id).unwrap(), expected);
            assert!(count(&db, RelationKind::Save, &bob, &post.id) <= 1);
        }
    }

    #[test]
    fn concurrent_toggles_never_duplicate_the_edge() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let post = seed_post(&db, &alice, "hot");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let db = db.clone();
                let (bob, post_id) = (bob.clone(), post.id.clone());
                std::thread::spawn(move || db.toggle_relation(RelationKind::Like, &bob, &post_id).unwrap())
            })
            .collect();

        let created = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|t| *t == Toggle::Created)
            .count();

        // 16 alternating toggles: half create, half delete, nothing left over
        assert_eq!(created, 8);
        assert_eq!(count(&db, RelationKind::Like, &bob, &post.id), 0);
    }

    #[test]
    fn duplicate_create_is_a_conflict() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let post = seed_post(&db, &alice, "p");

        db.create_relation(RelationKind::Like, &alice, &post.id).unwrap();
        let err = db.create_relation(RelationKind::Like, &alice, &post.id).unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
        assert_eq!(count(&db, RelationKind::Like, &alice, &post.id), 1);

        assert!(db.remove_relation(RelationKind::Like, &alice, &post.id).unwrap());
        assert!(!db.remove_relation(RelationKind::Like, &alice, &post.id).unwrap());
    }

    #[test]
    fn relation_to_missing_target_is_missing_reference() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");

        let err = db.toggle_relation(RelationKind::Follow, &alice, "ghost").unwrap_err();
        assert!(matches!(err, DbError::MissingReference(_)));
    }

    #[test]
    fn self_follow_is_rejected_by_the_store() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");

        assert!(db.create_relation(RelationKind::Follow, &alice, &alice).is_err());
        assert_eq!(count(&db, RelationKind::Follow, &alice, &alice), 0);
    }

    #[test]
    fn related_targets_reports_only_the_actors_edges() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let p1 = seed_post(&db, &alice, "p1");
        let p2 = seed_post(&db, &alice, "p2");
        let p3 = seed_post(&db, &alice, "p3");

        db.create_relation(RelationKind::Like, &bob, &p1.id).unwrap();
        db.create_relation(RelationKind::Like, &alice, &p2.id).unwrap();

        let ids = vec![p1.id.clone(), p2.id.clone(), p3.id.clone()];
        let liked = db.related_targets(RelationKind::Like, &bob, &ids).unwrap();
        assert_eq!(liked, HashSet::from([p1.id.clone()]));
        assert!(db.related_targets(RelationKind::Like, &bob, &[]).unwrap().is_empty());
    }

    #[test]
    fn related_targets_spans_more_ids_than_one_statement_binds() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let first = seed_post(&db, &alice, "first");
        let last = seed_post(&db, &alice, "last");
        db.create_relation(RelationKind::Save, &alice, &first.id).unwrap();
        db.create_relation(RelationKind::Save, &alice, &last.id).unwrap();

        let mut ids = vec![first.id.clone()];
        ids.extend((0..40_000).map(|i| format!("missing-{i}")));
        ids.push(last.id.clone());

        let saved = db.related_targets(RelationKind::Save, &alice, &ids).unwrap();
        assert_eq!(saved, HashSet::from([first.id.clone(), last.id.clone()]));
    }

    #[test]
    fn follow_lists_join_the_other_user() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let carol = seed_user(&db, "carol");

        db.create_relation(RelationKind::Follow, &bob, &alice).unwrap();
        db.create_relation(RelationKind::Follow, &carol, &alice).unwrap();
        db.create_relation(RelationKind::Follow, &alice, &carol).unwrap();

        let followers: Vec<_> = db
            .list_followers(&alice)
            .unwrap()
            .into_iter()
            .map(|f| f.user.username.unwrap())
            .collect();
        assert_eq!(followers, vec!["carol", "bob"]);

        let following = db.list_following(&alice).unwrap();
        assert_eq!(following.len(), 1);
        assert_eq!(following[0].user.id, carol);
        assert!(db.relation_exists(RelationKind::Follow, &alice, &carol).unwrap());
        assert!(!db.relation_exists(RelationKind::Follow, &carol, &bob).unwrap());
    }
}
