use std::fmt;

use sea_orm::{DbErr, RuntimeErr, SqlErr};
use uuid::Uuid;

#[derive(Debug)]
pub enum DaoLayerError {
    Db(DbErr),
    NotFound { entity: &'static str, id: Uuid },
    Conflict(String),
}

pub type DaoResult<T> = Result<T, DaoLayerError>;

impl DaoLayerError {
    /// Maps unique-constraint violations to `Conflict`, everything else to `Db`.
    pub fn from_write(err: DbErr, conflict_message: &str) -> Self {
        if is_unique_violation(&err) {
            return DaoLayerError::Conflict(conflict_message.to_string());
        }
        DaoLayerError::Db(err)
    }
}

pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// SQLite lock contention (`SQLITE_BUSY`/`SQLITE_LOCKED` and their extended
/// codes). Raised immediately, without the busy handler, when two deferred
/// transactions both try to upgrade to a write lock.
pub fn is_busy(err: &DbErr) -> bool {
    let (DbErr::Conn(RuntimeErr::SqlxError(inner))
    | DbErr::Exec(RuntimeErr::SqlxError(inner))
    | DbErr::Query(RuntimeErr::SqlxError(inner))) = err
    else {
        return false;
    };
    inner
        .as_database_error()
        .and_then(|db_err| db_err.code())
        .is_some_and(|code| matches!(code.as_ref(), "5" | "6" | "261" | "262" | "517"))
}

impl fmt::Display for DaoLayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaoLayerError::Db(err) => write!(f, "Database error: {err}"),
            DaoLayerError::NotFound { entity, id } => {
                write!(f, "{entity} not found (id={id})")
            }
            DaoLayerError::Conflict(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for DaoLayerError {}

impl From<DbErr> for DaoLayerError {
    fn from(err: DbErr) -> Self {
        DaoLayerError::Db(err)
    }
}
