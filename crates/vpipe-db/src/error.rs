//! Database error types.

use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Video not found: {0}")]
    VideoNotFound(u64),

    #[error("Value {value} does not fit column {column}")]
    OutOfRange { column: &'static str, value: u64 },

    #[error("Invalid row: {0}")]
    InvalidRow(String),
}

impl DbError {
    pub fn invalid_row(msg: impl Into<String>) -> Self {
        Self::InvalidRow(msg.into())
    }
}

/// Convert an unsigned domain value into SQLite's signed integer.
pub(crate) fn to_db_int(column: &'static str, value: u64) -> DbResult<i64> {
    i64::try_from(value).map_err(|_| DbError::OutOfRange { column, value })
}

/// Convert a stored integer back into an unsigned domain value.
pub(crate) fn from_db_int(column: &'static str, value: i64) -> DbResult<u64> {
    u64::try_from(value).map_err(|_| DbError::invalid_row(format!("{} is negative: {}", column, value)))
}
