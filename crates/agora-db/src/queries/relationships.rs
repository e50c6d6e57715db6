use rusqlite::{OptionalExtension, Row, params};

use super::ensure_owner;
use crate::models::{RelationshipFilter, RelationshipRow};
use crate::{Database, DbError, DbResult};

impl Database {
    /// Records that `follower_id` follows `followed_id`. The follower owns the edge.
    pub fn create_relationship(&self, follower_id: i64, followed_id: i64) -> DbResult<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO relationships (follower_user_id, followed_user_id) VALUES (?1, ?2)",
                params![follower_id, followed_id],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_relationship(&self, id: i64) -> DbResult<RelationshipRow> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, follower_user_id, followed_user_id FROM relationships WHERE id = ?1",
                [id],
                relationship_from_row,
            )
            .optional()?
            .ok_or(DbError::NotFound("relationship"))
        })
    }

    pub fn list_relationships(&self, filter: RelationshipFilter) -> DbResult<Vec<RelationshipRow>> {
        self.with_conn(|conn| {
            let (sql, user_id) = match filter {
                RelationshipFilter::Follower(id) => (
                    "SELECT id, follower_user_id, followed_user_id FROM relationships
                     WHERE follower_user_id = ?1 ORDER BY id",
                    id,
                ),
                RelationshipFilter::Followed(id) => (
                    "SELECT id, follower_user_id, followed_user_id FROM relationships
                     WHERE followed_user_id = ?1 ORDER BY id",
                    id,
                ),
            };
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map([user_id], relationship_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_relationship(&self, id: i64, requester_id: i64) -> DbResult<()> {
        self.with_conn(|conn| {
            ensure_owner(
                conn,
                "SELECT follower_user_id FROM relationships WHERE id = ?1",
                id,
                requester_id,
                "relationship",
            )?;
            conn.execute("DELETE FROM relationships WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Drops every edge from `follower_id` to `followed_id`.
    pub fn unfollow(&self, follower_id: i64, followed_id: i64) -> DbResult<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM relationships WHERE follower_user_id = ?1 AND followed_user_id = ?2",
                params![follower_id, followed_id],
            )?;
            Ok(removed)
        })
    }
}

fn relationship_from_row(row: &Row<'_>) -> rusqlite::Result<RelationshipRow> {
    Ok(RelationshipRow {
        id: row.get(0)?,
        follower_user_id: row.get(1)?,
        followed_user_id: row.get(2)?,
    })
}
