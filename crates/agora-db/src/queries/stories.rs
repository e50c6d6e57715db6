use rusqlite::{Connection, OptionalExtension, Row, params};

use super::ensure_owner;
use crate::models::{StoryFilter, StoryRow};
use crate::{Database, DbError, DbResult};

const STORY_OWNER: &str = "SELECT user_id FROM stories WHERE id = ?1";

impl Database {
    pub fn create_story(&self, owner_id: i64, img: &str) -> DbResult<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO stories (img, user_id) VALUES (?1, ?2)",
                params![img, owner_id],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_story(&self, id: i64) -> DbResult<StoryRow> {
        self.with_conn(|conn| query_story(conn, id))
    }

    /// Stories carry no timestamp, so newest means highest id.
    pub fn list_stories(&self, filter: StoryFilter) -> DbResult<Vec<StoryRow>> {
        self.with_conn(|conn| {
            let (sql, user_id) = match filter {
                StoryFilter::ByUser(user_id) => (
                    "SELECT id, img, user_id FROM stories WHERE user_id = ?1 ORDER BY id DESC",
                    user_id,
                ),
                StoryFilter::Feed(user_id) => (
                    "SELECT id, img, user_id FROM stories
                     WHERE user_id = ?1 OR user_id IN
                        (SELECT followed_user_id FROM relationships WHERE follower_user_id = ?1)
                     ORDER BY id DESC",
                    user_id,
                ),
            };
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map([user_id], story_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_story(&self, id: i64, requester_id: i64, img: &str) -> DbResult<StoryRow> {
        self.with_conn(|conn| {
            ensure_owner(conn, STORY_OWNER, id, requester_id, "story")?;
            conn.execute("UPDATE stories SET img = ?2 WHERE id = ?1", params![id, img])?;
            query_story(conn, id)
        })
    }

    pub fn delete_story(&self, id: i64, requester_id: i64) -> DbResult<()> {
        self.with_conn(|conn| {
            ensure_owner(conn, STORY_OWNER, id, requester_id, "story")?;
            conn.execute("DELETE FROM stories WHERE id = ?1", [id])?;
            Ok(())
        })
    }
}

fn query_story(conn: &Connection, id: i64) -> DbResult<StoryRow> {
    conn.query_row(
        "SELECT id, img, user_id FROM stories WHERE id = ?1",
        [id],
        story_from_row,
    )
    .optional()?
    .ok_or(DbError::NotFound("story"))
}

fn story_from_row(row: &Row<'_>) -> rusqlite::Result<StoryRow> {
    Ok(StoryRow {
        id: row.get(0)?,
        img: row.get(1)?,
        user_id: row.get(2)?,
    })
}
