use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                username        TEXT UNIQUE,
                email           TEXT NOT NULL UNIQUE,
                password        TEXT NOT NULL,
                first_name      TEXT,
                last_name       TEXT,
                bio             TEXT,
                birthday        TEXT,
                avatar          TEXT,
                is_verified     INTEGER NOT NULL DEFAULT 0,
                last_login      TEXT,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE TABLE avatars (
                id      TEXT PRIMARY KEY,
                url     TEXT NOT NULL,
                label   TEXT
            );

            CREATE TABLE posts (
                id              TEXT PRIMARY KEY,
                author_id       TEXT NOT NULL REFERENCES users(id),
                author          TEXT,
                author_avatar   TEXT,
                title           TEXT NOT NULL,
                subtitle        TEXT,
                content         TEXT NOT NULL,
                image           TEXT,
                video           TEXT,
                is_edited       INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_posts_author ON posts(author_id);
            CREATE INDEX idx_posts_created ON posts(created_at);

            CREATE TABLE likes (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id),
                post_id     TEXT NOT NULL REFERENCES posts(id),
                created_at  TEXT NOT NULL,
                UNIQUE(user_id, post_id)
            );

            CREATE INDEX idx_likes_post ON likes(post_id);

            CREATE TABLE saves (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id),
                post_id     TEXT NOT NULL REFERENCES posts(id),
                created_at  TEXT NOT NULL,
                UNIQUE(user_id, post_id)
            );

            CREATE TABLE follows (
                id              TEXT PRIMARY KEY,
                follower_id     TEXT NOT NULL REFERENCES users(id),
                following_id    TEXT NOT NULL REFERENCES users(id),
                created_at      TEXT NOT NULL,
                UNIQUE(follower_id, following_id),
                CHECK(follower_id <> following_id)
            );

            CREATE INDEX idx_follows_following ON follows(following_id);

            CREATE TABLE comments (
                id          TEXT PRIMARY KEY,
                post_id     TEXT NOT NULL REFERENCES posts(id),
                user_id     TEXT NOT NULL REFERENCES users(id),
                username    TEXT,
                user_avatar TEXT,
                content     TEXT NOT NULL,
                is_edited   INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_comments_post ON comments(post_id, created_at);

            -- target_id is deliberately not a foreign key: reports outlive their targets
            CREATE TABLE reports (
                id          TEXT PRIMARY KEY,
                reporter_id TEXT NOT NULL REFERENCES users(id),
                target_id   TEXT NOT NULL,
                target_type TEXT NOT NULL CHECK(target_type IN ('User', 'Post')),
                reason      TEXT NOT NULL,
                description TEXT,
                status      TEXT NOT NULL DEFAULT 'Pending'
                            CHECK(status IN ('Pending', 'Reviewed', 'Resolved')),
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                UNIQUE(reporter_id, target_type, target_id)
            );

            -- Seed the stock avatar catalogue
            INSERT INTO avatars (id, url, label) VALUES
                ('avatar-01', '/avatars/01.png', 'Fox'),
                ('avatar-02', '/avatars/02.png', 'Owl'),
                ('avatar-03', '/avatars/03.png', 'Otter'),
                ('avatar-04', '/avatars/04.png', 'Heron'),
                ('avatar-05', '/avatars/05.png', 'Lynx'),
                ('avatar-06', '/avatars/06.png', 'Badger');

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn migrations_create_every_table() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();

        let tables = table_names(&conn);
        for expected in [
            "avatars", "comments", "follows", "likes", "posts", "reports", "saves", "users",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, 1);

        let avatars: i64 = conn
            .query_row("SELECT COUNT(*) FROM avatars", [], |row| row.get(0))
            .unwrap();
        assert_eq!(avatars, 6);
    }
}
