use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;

use super::ensure_owner;
use crate::models::{NewUser, UserChanges, UserRow};
use crate::{Database, DbError, DbResult};

const USER_COLUMNS: &str =
    "id, username, email, password, name, cover_pic, profile_pic, city, website";

impl Database {
    /// Inserts an account. The username check and the insert share one
    /// lock, so two registrations cannot both claim the same name.
    pub fn create_user(&self, user: &NewUser<'_>) -> DbResult<i64> {
        self.with_conn(|conn| {
            ensure_username_free(conn, user.username, None)?;
            conn.execute(
                "INSERT INTO users (username, email, password, name) VALUES (?1, ?2, ?3, ?4)",
                params![user.username, user.email, user.password_hash, user.name],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user(&self, id: i64) -> DbResult<UserRow> {
        self.with_conn(|conn| query_user(conn, id))
    }

    /// Oldest account with this username, used by login.
    pub fn get_user_by_username(&self, username: &str) -> DbResult<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users WHERE username = ?1 ORDER BY id LIMIT 1"
            );
            Ok(conn.query_row(&sql, [username], user_from_row).optional()?)
        })
    }

    pub fn update_user(
        &self,
        id: i64,
        requester_id: i64,
        changes: &UserChanges<'_>,
    ) -> DbResult<UserRow> {
        self.with_conn(|conn| {
            ensure_owner(conn, "SELECT id FROM users WHERE id = ?1", id, requester_id, "user")?;
            if let Some(username) = changes.username {
                ensure_username_free(conn, username, Some(id))?;
            }
            conn.execute(
                "UPDATE users SET
                    username    = COALESCE(?2, username),
                    email       = COALESCE(?3, email),
                    name        = COALESCE(?4, name),
                    cover_pic   = COALESCE(?5, cover_pic),
                    profile_pic = COALESCE(?6, profile_pic),
                    city        = COALESCE(?7, city),
                    website     = COALESCE(?8, website)
                 WHERE id = ?1",
                params![
                    id,
                    changes.username,
                    changes.email,
                    changes.name,
                    changes.cover_pic,
                    changes.profile_pic,
                    changes.city,
                    changes.website,
                ],
            )?;
            query_user(conn, id)
        })
    }

    /// Deletes the account; posts, comments, stories, likes and follow
    /// edges go with it through the foreign-key cascades.
    pub fn delete_user(&self, id: i64, requester_id: i64) -> DbResult<()> {
        self.with_conn(|conn| {
            ensure_owner(conn, "SELECT id FROM users WHERE id = ?1", id, requester_id, "user")?;
            conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            info!("Deleted user {}", id);
            Ok(())
        })
    }
}

/// Usernames are what login resolves, so at most one account may hold each.
fn ensure_username_free(conn: &Connection, username: &str, except_id: Option<i64>) -> DbResult<()> {
    let holder: Option<i64> = conn
        .query_row(
            "SELECT id FROM users WHERE username = ?1 AND id IS NOT ?2 LIMIT 1",
            params![username, except_id],
            |r| r.get(0),
        )
        .optional()?;
    match holder {
        Some(_) => Err(DbError::Conflict("users.username is taken".into())),
        None => Ok(()),
    }
}

fn query_user(conn: &Connection, id: i64) -> DbResult<UserRow> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    conn.query_row(&sql, [id], user_from_row)
        .optional()?
        .ok_or(DbError::NotFound("user"))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        name: row.get(4)?,
        cover_pic: row.get(5)?,
        profile_pic: row.get(6)?,
        city: row.get(7)?,
        website: row.get(8)?,
    })
}
