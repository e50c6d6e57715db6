use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::ensure_owner;
use crate::models::CommentRow;
use crate::{Database, DbError, DbResult};

const COMMENT_SELECT: &str = "
    SELECT c.id, c.description, c.created_at, c.user_id, c.post_id, u.name, u.profile_pic
    FROM comments c
    JOIN users u ON u.id = c.user_id";

const COMMENT_OWNER: &str = "SELECT user_id FROM comments WHERE id = ?1";

impl Database {
    pub fn create_comment(&self, owner_id: i64, post_id: i64, description: &str) -> DbResult<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (description, created_at, user_id, post_id) VALUES (?1, ?2, ?3, ?4)",
                params![description, Utc::now(), owner_id, post_id],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_comment(&self, id: i64) -> DbResult<CommentRow> {
        self.with_conn(|conn| query_comment(conn, id))
    }

    /// Comments on one post, newest first.
    pub fn list_comments(&self, post_id: i64) -> DbResult<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let sql =
                format!("{COMMENT_SELECT} WHERE c.post_id = ?1 ORDER BY c.created_at DESC, c.id DESC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([post_id], comment_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_comment(
        &self,
        id: i64,
        requester_id: i64,
        description: &str,
    ) -> DbResult<CommentRow> {
        self.with_conn(|conn| {
            ensure_owner(conn, COMMENT_OWNER, id, requester_id, "comment")?;
            conn.execute(
                "UPDATE comments SET description = ?2 WHERE id = ?1",
                params![id, description],
            )?;
            query_comment(conn, id)
        })
    }

    pub fn delete_comment(&self, id: i64, requester_id: i64) -> DbResult<()> {
        self.with_conn(|conn| {
            ensure_owner(conn, COMMENT_OWNER, id, requester_id, "comment")?;
            conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            Ok(())
        })
    }
}

fn query_comment(conn: &Connection, id: i64) -> DbResult<CommentRow> {
    let sql = format!("{COMMENT_SELECT} WHERE c.id = ?1");
    conn.query_row(&sql, [id], comment_from_row)
        .optional()?
        .ok_or(DbError::NotFound("comment"))
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        description: row.get(1)?,
        created_at: row.get(2)?,
        user_id: row.get(3)?,
        post_id: row.get(4)?,
        author_name: row.get(5)?,
        author_profile_pic: row.get(6)?,
    })
}
