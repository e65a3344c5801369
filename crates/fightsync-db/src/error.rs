use fightsync_core::AppError;

// serialization_failure, deadlock_detected
const TRANSIENT_SQLSTATES: &[&str] = &["40001", "40P01"];

/// Map a sqlx error, separating outages worth retrying from real failures.
pub(crate) fn db_error(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::WorkerCrashed => AppError::StorageUnavailable(e.to_string()),
        sqlx::Error::Database(db)
            if db
                .code()
                .is_some_and(|code| TRANSIENT_SQLSTATES.iter().any(|s| *s == code)) =>
        {
            AppError::StorageUnavailable(e.to_string())
        }
        _ => AppError::DatabaseError(e.to_string()),
    }
}
