//! # rowmap-sqlx — SQLx backend for rowmap
//!
//! This crate provides the [SQLx](https://github.com/launchbadge/sqlx)-specific
//! implementations for `rowmap`'s database access layer. It depends on
//! [`rowmap`] for the driver seam and the conversion subsystem, and adds the
//! pool-backed [`Driver`](rowmap::Driver) implementations plus error
//! bridging needed to talk to a real database.
//!
//! # What's in this crate
//!
//! | Type | Description |
//! |------|-------------|
//! | `SqliteDriver` | `rowmap::Driver` backed by `sqlx::Pool<Sqlite>` (feature `sqlite`) |
//! | `PostgresDriver` | `rowmap::Driver` backed by `sqlx::Pool<Postgres>` (feature `postgres`) |
//! | `MySqlDriver` | `rowmap::Driver` backed by `sqlx::Pool<MySql>` (feature `mysql`) |
//! | [`SqlxErrorExt`] | Extension trait to convert `sqlx::Error` → `DatabaseError` |
//! | [`SqlxResult<T>`] | Type alias for `Result<T, DatabaseError>` |
//!
//! # Feature flags
//!
//! Enable exactly one database driver:
//!
//! | Feature    | Driver |
//! |------------|--------|
//! | `sqlite`   | SQLite via `sqlx/sqlite` |
//! | `postgres` | PostgreSQL via `sqlx/postgres` |
//! | `mysql`    | MySQL via `sqlx/mysql` |
//!
//! # Quick start
//!
//! ```toml
//! [dependencies]
//! rowmap-sqlx = { version = "0.1", features = ["sqlite"] }
//! ```
//!
//! ```ignore
//! use rowmap::Database;
//! use rowmap_sqlx::SqliteDriver;
//!
//! let pool = SqlitePoolOptions::new().connect("sqlite::memory:").await?;
//! let db = Database::builder(Arc::new(SqliteDriver::new(pool))).build();
//! let words: Vec<String> = db.find_all("select word from dictionary", &[]).await?;
//! ```
//!
//! # Error bridging
//!
//! Due to Rust's orphan rules, `From<sqlx::Error> for DatabaseError` can't
//! be implemented here. Use the [`SqlxErrorExt`] trait instead:
//!
//! ```ignore
//! use rowmap_sqlx::SqlxErrorExt;
//!
//! pool.begin().await.map_err(|e| e.into_database_error())?;
//! ```

pub mod error;

#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use error::{SqlxErrorExt, SqlxResult};

#[cfg(feature = "mysql")]
pub use mysql::MySqlDriver;
#[cfg(feature = "postgres")]
pub use postgres::PostgresDriver;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDriver;

/// Re-exports of the most commonly used types from both `rowmap` and this
/// crate.
pub mod prelude {
    pub use crate::{SqlxErrorExt, SqlxResult};
    pub use rowmap::prelude::*;

    #[cfg(feature = "mysql")]
    pub use crate::MySqlDriver;
    #[cfg(feature = "postgres")]
    pub use crate::PostgresDriver;
    #[cfg(feature = "sqlite")]
    pub use crate::SqliteDriver;
}
