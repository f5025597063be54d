//! # rowmap — database access convenience layer
//!
//! `rowmap` wraps a low-level database driver with ergonomic query
//! execution, result-to-object mapping, batch updates, and a polymorphic
//! type-conversion registry. It owns no SQL parser, pool, or transaction
//! manager; those come from the backend driver (see `rowmap-sqlx`).
//!
//! The heart of the crate is the conversion subsystem: conversions between
//! database-side values and model types are registered during startup,
//! frozen into an immutable map, and looked up polymorphically over a
//! type-descriptor graph (supertype chain first, then interfaces).
//!
//! ```ignore
//! let db = Database::builder(driver)
//!     .dialect(Arc::new(PostgresDialect))
//!     .configure_conversions(|registry| {
//!         registry.register_enum_conversion(|c: &Color| c.name().to_string());
//!     })
//!     .build();
//!
//! let words: Vec<String> = db.find_all("select word from dictionary", &[]).await?;
//! ```

pub mod config;
pub mod conversion;
pub mod database;
pub mod dialect;
pub mod driver;
pub mod enums;
pub mod error;
pub mod instantiation;
pub mod support;
pub mod types;
pub mod value;

pub use config::DatabaseConfig;
pub use conversion::{AnyValue, Conversions, TypeConversion, TypeConversionRegistry};
pub use database::{Database, DatabaseBuilder, Parameter};
pub use dialect::{DefaultDialect, Dialect, MySqlDialect, PostgresDialect, SqliteDialect};
pub use driver::{Driver, RawResultSet};
pub use enums::{DbEnum, EnumValue};
pub use error::DatabaseError;
pub use instantiation::{FromColumn, FromRow, Row};
pub use support::DatabaseSupport;
pub use types::TypeKey;
pub use value::{DatabaseEnum, SqlValue};

pub mod prelude {
    //! Re-exports of the most commonly used types.
    pub use crate::{
        Database, DatabaseConfig, DatabaseError, DbEnum, Driver, FromRow, Parameter, Row,
        SqlValue, TypeConversionRegistry,
    };
}
