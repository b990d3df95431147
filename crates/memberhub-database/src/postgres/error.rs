//! Mapping of sqlx failures onto the application error taxonomy.

use memberhub_core::error::{AppError, ErrorKind};

/// Classify a sqlx error.
///
/// Pool exhaustion and I/O failures are transient; unique violations are
/// conflicts; missing rows are not-found; everything else is a database error.
pub fn classify(err: &sqlx::Error) -> ErrorKind {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            ErrorKind::TransientStore
        }
        sqlx::Error::RowNotFound => ErrorKind::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => ErrorKind::Conflict,
        _ => ErrorKind::Database,
    }
}

/// Build a `map_err` adapter that attaches `context` to the sqlx error.
pub fn map_sqlx(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |err| {
        let kind = classify(&err);
        AppError::with_source(kind, format!("{context}: {err}"), err)
    }
}
