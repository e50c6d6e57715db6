use rusqlite::{Connection, params};
use tracing::info;

use crate::DbResult;

/// One reversible schema step. `up` and `down` are applied inside a
/// transaction together with the `schema_version` bookkeeping.
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub up: &'static str,
    pub down: &'static str,
}

/// Ordered oldest first. Tables are created parents before children and
/// dropped children before parents.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "init_social_schema",
        up: "
        CREATE TABLE users (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            username    VARCHAR(45) NOT NULL,
            email       VARCHAR(100) NOT NULL UNIQUE,
            password    VARCHAR(200) NOT NULL,
            name        VARCHAR(45) NOT NULL,
            cover_pic   VARCHAR(100),
            profile_pic VARCHAR(100),
            city        VARCHAR(45),
            website     VARCHAR(45)
        );

        CREATE TABLE posts (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            description VARCHAR(200),
            img         VARCHAR(200),
            user_id     INTEGER NOT NULL
                        REFERENCES users(id) ON DELETE CASCADE ON UPDATE CASCADE,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE comments (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            description VARCHAR(200) NOT NULL,
            created_at  TEXT NOT NULL,
            user_id     INTEGER NOT NULL
                        REFERENCES users(id) ON DELETE CASCADE ON UPDATE CASCADE,
            post_id     INTEGER NOT NULL
                        REFERENCES posts(id) ON DELETE CASCADE ON UPDATE CASCADE
        );

        CREATE TABLE stories (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            img         VARCHAR(200),
            user_id     INTEGER NOT NULL
                        REFERENCES users(id) ON DELETE CASCADE ON UPDATE CASCADE
        );

        CREATE TABLE relationships (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            follower_user_id  INTEGER NOT NULL
                              REFERENCES users(id) ON DELETE CASCADE ON UPDATE CASCADE,
            followed_user_id  INTEGER NOT NULL
                              REFERENCES users(id) ON DELETE CASCADE ON UPDATE CASCADE
        );

        CREATE TABLE likes (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL
                        REFERENCES users(id) ON DELETE CASCADE ON UPDATE CASCADE,
            post_id     INTEGER NOT NULL
                        REFERENCES posts(id) ON DELETE CASCADE ON UPDATE CASCADE
        );
        ",
        down: "
        DROP TABLE IF EXISTS likes;
        DROP TABLE IF EXISTS relationships;
        DROP TABLE IF EXISTS stories;
        DROP TABLE IF EXISTS comments;
        DROP TABLE IF EXISTS posts;
        DROP TABLE IF EXISTS users;
        ",
    },
    Migration {
        version: 2,
        name: "foreign_key_indexes",
        up: "
        CREATE INDEX idx_posts_user ON posts(user_id, created_at);
        CREATE INDEX idx_comments_post ON comments(post_id, created_at);
        CREATE INDEX idx_stories_user ON stories(user_id);
        CREATE INDEX idx_relationships_follower ON relationships(follower_user_id);
        CREATE INDEX idx_relationships_followed ON relationships(followed_user_id);
        CREATE INDEX idx_likes_post ON likes(post_id);
        ",
        down: "
        DROP INDEX IF EXISTS idx_likes_post;
        DROP INDEX IF EXISTS idx_relationships_followed;
        DROP INDEX IF EXISTS idx_relationships_follower;
        DROP INDEX IF EXISTS idx_stories_user;
        DROP INDEX IF EXISTS idx_comments_post;
        DROP INDEX IF EXISTS idx_posts_user;
        ",
    },
];

fn ensure_version_table(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version     INTEGER PRIMARY KEY,
            name        TEXT NOT NULL,
            applied_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;
    Ok(())
}

pub fn current_version(conn: &Connection) -> DbResult<i64> {
    ensure_version_table(conn)?;
    let version =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;
    Ok(version)
}

/// Applies every migration newer than the recorded version.
pub fn run(conn: &mut Connection) -> DbResult<()> {
    let current = current_version(conn)?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        info!("Applying migration v{} ({})", migration.version, migration.name);
        let tx = conn.transaction()?;
        tx.execute_batch(migration.up)?;
        tx.execute(
            "INSERT INTO schema_version (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;
    }

    info!("Database migrations complete");
    Ok(())
}

/// Reverts applied migrations, newest first, until `target` is the
/// highest remaining version.
pub fn revert(conn: &mut Connection, target: i64) -> DbResult<()> {
    let current = current_version(conn)?;

    for migration in MIGRATIONS
        .iter()
        .rev()
        .filter(|m| m.version > target && m.version <= current)
    {
        info!("Reverting migration v{} ({})", migration.version, migration.name);
        let tx = conn.transaction()?;
        tx.execute_batch(migration.down)?;
        tx.execute(
            "DELETE FROM schema_version WHERE version = ?1",
            [migration.version],
        )?;
        tx.commit()?;
    }

    Ok(())
}
