pub mod error;
pub mod migrations;
pub mod models;
pub mod queries;

pub use error::{DbError, DbResult};

use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Handle to the SQLite schema store.
///
/// A single connection sits behind a mutex, so every repository call sees
/// a consistent view and ownership checks run in the same critical section
/// as the mutation that follows them.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent readers from other processes
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        let db = Self::init(conn)?;

        info!("Database opened at {} (journal_mode={})", path.display(), mode);
        Ok(db)
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> DbResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&mut conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T>,
    {
        let conn = self.conn.lock().map_err(|e| DbError::Poisoned(e.to_string()))?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&mut Connection) -> DbResult<T>,
    {
        let mut conn = self.conn.lock().map_err(|e| DbError::Poisoned(e.to_string()))?;
        f(&mut conn)
    }

    /// Reverts applied migrations down to `target` (0 drops every table).
    pub fn revert_to(&self, target: i64) -> DbResult<()> {
        self.with_conn_mut(|conn| migrations::revert(conn, target))
    }

    pub fn schema_version(&self) -> DbResult<i64> {
        self.with_conn(migrations::current_version)
    }
}
