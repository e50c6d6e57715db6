use rusqlite::ffi;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} belongs to another user")]
    Forbidden(&'static str),

    #[error("uniqueness violation: {0}")]
    Conflict(String),

    #[error("referential integrity violation: {0}")]
    ForeignKey(String),

    #[error("sqlite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("database lock poisoned: {0}")]
    Poisoned(String),
}

pub type DbResult<T> = Result<T, DbError>;

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, msg) = &err {
            let detail = msg.clone().unwrap_or_else(|| code.to_string());
            match code.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return DbError::Conflict(detail);
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return DbError::ForeignKey(detail),
                _ => {}
            }
        }
        DbError::Sqlite(err)
    }
}
