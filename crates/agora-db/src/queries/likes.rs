use rusqlite::{OptionalExtension, Row, params};

use super::ensure_owner;
use crate::models::LikeRow;
use crate::{Database, DbError, DbResult};

impl Database {
    /// The schema has no uniqueness on (user_id, post_id), so liking twice
    /// stores two rows.
    pub fn create_like(&self, owner_id: i64, post_id: i64) -> DbResult<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO likes (user_id, post_id) VALUES (?1, ?2)",
                params![owner_id, post_id],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_like(&self, id: i64) -> DbResult<LikeRow> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, user_id, post_id FROM likes WHERE id = ?1",
                [id],
                like_from_row,
            )
            .optional()?
            .ok_or(DbError::NotFound("like"))
        })
    }

    pub fn list_likes(&self, post_id: i64) -> DbResult<Vec<LikeRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, user_id, post_id FROM likes WHERE post_id = ?1 ORDER BY id")?;
            let rows = stmt
                .query_map([post_id], like_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_like(&self, id: i64, requester_id: i64) -> DbResult<()> {
        self.with_conn(|conn| {
            ensure_owner(conn, "SELECT user_id FROM likes WHERE id = ?1", id, requester_id, "like")?;
            conn.execute("DELETE FROM likes WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Removes every like `owner_id` left on `post_id`. Returns the number
    /// of rows removed; zero means there was nothing to unlike.
    pub fn delete_likes_for_post(&self, owner_id: i64, post_id: i64) -> DbResult<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2",
                params![owner_id, post_id],
            )?;
            Ok(removed)
        })
    }
}

fn like_from_row(row: &Row<'_>) -> rusqlite::Result<LikeRow> {
    Ok(LikeRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        post_id: row.get(2)?,
    })
}
