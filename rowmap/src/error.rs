use std::error::Error;
use std::fmt;

/// Errors that can occur in the database access layer.
#[derive(Debug)]
pub enum DatabaseError {
    /// No conversion is registered between the given source and target types.
    NoConversion {
        source: &'static str,
        target: &'static str,
    },
    /// A stored enum key matched none of the enum's constants.
    UnmatchedEnumKey {
        enum_type: &'static str,
        key: String,
    },
    /// A non-optional value was requested but the column was NULL.
    NullValue { target: &'static str },
    /// A conversion function rejected the value (out of range, parse failure, ...).
    Conversion(String),
    /// A unique lookup matched no rows.
    EmptyResult,
    /// A unique or optional lookup matched more than one row.
    NonUniqueResult { count: usize },
    /// The active dialect does not support the requested operation.
    UnsupportedOperation {
        dialect: &'static str,
        operation: &'static str,
    },
    /// A failure tied to a specific SQL statement.
    Query {
        sql: String,
        cause: Box<DatabaseError>,
    },
    /// An error raised by the underlying database driver.
    Database(Box<dyn Error + Send + Sync>),
    /// The registry or builder was set up inconsistently.
    Configuration(String),
}

impl DatabaseError {
    /// Construct a `Database` variant from any error type.
    ///
    /// Used by backend crates to wrap driver-specific errors.
    pub fn database(err: impl Error + Send + Sync + 'static) -> Self {
        DatabaseError::Database(Box::new(err))
    }

    /// Attach the originating SQL statement to this error.
    pub(crate) fn with_query(self, sql: &str) -> Self {
        DatabaseError::Query {
            sql: sql.to_string(),
            cause: Box::new(self),
        }
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::NoConversion { source, target } => {
                write!(f, "No conversion registered from `{source}` to `{target}`")
            }
            DatabaseError::UnmatchedEnumKey { enum_type, key } => {
                write!(f, "Stored key {key} matches no constant of enum `{enum_type}`")
            }
            DatabaseError::NullValue { target } => {
                write!(f, "Unexpected NULL value for non-optional `{target}`")
            }
            DatabaseError::Conversion(msg) => write!(f, "Conversion failed: {msg}"),
            DatabaseError::EmptyResult => write!(f, "Expected exactly one row, got none"),
            DatabaseError::NonUniqueResult { count } => {
                write!(f, "Expected at most one row, got {count}")
            }
            DatabaseError::UnsupportedOperation { dialect, operation } => {
                write!(f, "Dialect `{dialect}` does not support {operation}")
            }
            DatabaseError::Query { sql, cause } => write!(f, "Query `{sql}` failed: {cause}"),
            DatabaseError::Database(err) => write!(f, "Database error: {err}"),
            DatabaseError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl Error for DatabaseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DatabaseError::Database(err) => Some(err.as_ref()),
            DatabaseError::Query { cause, .. } => Some(&**cause),
            _ => None,
        }
    }
}
