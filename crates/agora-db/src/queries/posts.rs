use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::ensure_owner;
use crate::models::{PostFields, PostFilter, PostRow};
use crate::{Database, DbError, DbResult};

// JOIN users to fetch the author's name and avatar in a single query
const POST_SELECT: &str = "
    SELECT p.id, p.description, p.img, p.user_id, p.created_at, u.name, u.profile_pic
    FROM posts p
    JOIN users u ON u.id = p.user_id";

const POST_OWNER: &str = "SELECT user_id FROM posts WHERE id = ?1";

impl Database {
    /// Inserts a post owned by `owner_id`; `created_at` is stamped here.
    pub fn create_post(&self, owner_id: i64, fields: &PostFields<'_>) -> DbResult<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (description, img, user_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![fields.description, fields.img, owner_id, Utc::now()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_post(&self, id: i64) -> DbResult<PostRow> {
        self.with_conn(|conn| query_post(conn, id))
    }

    /// Newest first.
    pub fn list_posts(&self, filter: PostFilter) -> DbResult<Vec<PostRow>> {
        self.with_conn(|conn| {
            let (condition, user_id) = match filter {
                PostFilter::ByUser(user_id) => ("p.user_id = ?1", user_id),
                // Subquery instead of a join so duplicate follow edges don't duplicate posts
                PostFilter::Feed(user_id) => (
                    "p.user_id = ?1 OR p.user_id IN
                        (SELECT followed_user_id FROM relationships WHERE follower_user_id = ?1)",
                    user_id,
                ),
            };
            let sql = format!("{POST_SELECT} WHERE {condition} ORDER BY p.created_at DESC, p.id DESC");

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], post_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_post(
        &self,
        id: i64,
        requester_id: i64,
        fields: &PostFields<'_>,
    ) -> DbResult<PostRow> {
        self.with_conn(|conn| {
            ensure_owner(conn, POST_OWNER, id, requester_id, "post")?;
            conn.execute(
                "UPDATE posts SET
                    description = COALESCE(?2, description),
                    img         = COALESCE(?3, img)
                 WHERE id = ?1",
                params![id, fields.description, fields.img],
            )?;
            query_post(conn, id)
        })
    }

    /// Comments and likes on the post are removed by the cascade.
    pub fn delete_post(&self, id: i64, requester_id: i64) -> DbResult<()> {
        self.with_conn(|conn| {
            ensure_owner(conn, POST_OWNER, id, requester_id, "post")?;
            conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(())
        })
    }
}

fn query_post(conn: &Connection, id: i64) -> DbResult<PostRow> {
    let sql = format!("{POST_SELECT} WHERE p.id = ?1");
    conn.query_row(&sql, [id], post_from_row)
        .optional()?
        .ok_or(DbError::NotFound("post"))
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        description: row.get(1)?,
        img: row.get(2)?,
        user_id: row.get(3)?,
        created_at: row.get(4)?,
        author_name: row.get(5)?,
        author_profile_pic: row.get(6)?,
    })
}
