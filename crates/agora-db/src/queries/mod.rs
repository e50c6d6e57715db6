//! Resource repositories, one module per table. Every mutation of an owned
//! row goes through [`ensure_owner`] while the connection lock is held.

mod comments;
mod likes;
mod posts;
mod relationships;
mod stories;
mod users;

use agora_types::access::authorize;
use rusqlite::{Connection, OptionalExtension};

use crate::{DbError, DbResult};

/// Looks up the owner of row `id` with `owner_sql` (a single-column select
/// keyed by `?1`) and checks it against `requester_id`.
fn ensure_owner(
    conn: &Connection,
    owner_sql: &str,
    id: i64,
    requester_id: i64,
    entity: &'static str,
) -> DbResult<()> {
    let owner: Option<i64> = conn.query_row(owner_sql, [id], |row| row.get(0)).optional()?;

    match owner {
        None => Err(DbError::NotFound(entity)),
        Some(owner_id) if authorize(requester_id, owner_id).is_allowed() => Ok(()),
        Some(_) => Err(DbError::Forbidden(entity)),
    }
}
