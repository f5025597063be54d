use rowmap::DatabaseError;

/// Extension trait for converting `sqlx::Error` into [`DatabaseError`].
///
/// Due to Rust's orphan rules, `From<sqlx::Error> for DatabaseError` can't
/// be implemented in this crate. Use `.into_database_error()` instead.
pub trait SqlxErrorExt {
    fn into_database_error(self) -> DatabaseError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_database_error(self) -> DatabaseError {
        match &self {
            sqlx::Error::RowNotFound => DatabaseError::EmptyResult,
            _ => DatabaseError::database(self),
        }
    }
}

/// Convenience alias for results using [`DatabaseError`].
pub type SqlxResult<T> = Result<T, DatabaseError>;
