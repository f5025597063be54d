//! Per-database-product behavior.

use std::sync::Arc;

use crate::enums::EnumValue;
use crate::error::DatabaseError;
use crate::value::{DatabaseEnum, SqlValue};

/// Database-product-specific behavior.
///
/// Dialects are stateless strategy singletons; one `Arc<dyn Dialect>` is
/// shared by everything created from the same [`Database`](crate::Database).
pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// Placeholder for the parameter at `index` (1-based).
    fn placeholder(&self, index: usize) -> String {
        let _ = index;
        "?".to_string()
    }

    fn quote_char(&self) -> char {
        '"'
    }

    fn supports_native_enums(&self) -> bool {
        false
    }

    /// Represent an enum constant as a database-native tagged value.
    ///
    /// Dialects without native enum types keep the default implementation;
    /// parameter binding then falls back to the registered conversion or to
    /// the constant's symbolic name as text.
    fn create_database_enum(&self, value: &dyn EnumValue) -> Result<SqlValue, DatabaseError> {
        let _ = value;
        Err(DatabaseError::UnsupportedOperation {
            dialect: self.name(),
            operation: "native database enums",
        })
    }
}

/// Fallback dialect with `?` placeholders and no native enum support.
pub struct DefaultDialect;

impl Dialect for DefaultDialect {
    fn name(&self) -> &'static str {
        "generic"
    }
}

pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn supports_native_enums(&self) -> bool {
        true
    }

    fn create_database_enum(&self, value: &dyn EnumValue) -> Result<SqlValue, DatabaseError> {
        let type_name = upper_camel_to_lower_snake(value.enum_type_name());
        if !is_valid_type_name(&type_name) {
            return Err(DatabaseError::Database(
                format!(
                    "invalid enum type name `{type_name}` derived from `{}`",
                    value.enum_type_name()
                )
                .into(),
            ));
        }
        Ok(SqlValue::Enum(DatabaseEnum {
            type_name,
            value: value.constant_name().to_string(),
        }))
    }
}

pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_char(&self) -> char {
        '`'
    }
}

pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }
}

/// Detect a dialect from a connection URL scheme.
pub fn detect(url: &str) -> Arc<dyn Dialect> {
    let scheme = url.split(':').next().unwrap_or("");
    let dialect: Arc<dyn Dialect> = match scheme {
        "postgres" | "postgresql" => Arc::new(PostgresDialect),
        "mysql" | "mariadb" => Arc::new(MySqlDialect),
        "sqlite" => Arc::new(SqliteDialect),
        _ => Arc::new(DefaultDialect),
    };
    tracing::debug!(scheme, dialect = dialect.name(), "detected dialect");
    dialect
}

/// `OrderStatus` -> `order_status`.
pub fn upper_camel_to_lower_snake(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    for (index, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if index > 0 {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}

fn is_valid_type_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::db_enum! {
        enum OrderStatus { Pending, Shipped, Delivered }
    }

    #[test]
    fn camel_to_snake() {
        assert_eq!(upper_camel_to_lower_snake("OrderStatus"), "order_status");
        assert_eq!(upper_camel_to_lower_snake("Color"), "color");
        assert_eq!(upper_camel_to_lower_snake("status"), "status");
    }

    #[test]
    fn postgres_derives_the_enum_type_name() {
        let value = PostgresDialect
            .create_database_enum(&OrderStatus::Pending)
            .unwrap();
        assert_eq!(
            value,
            SqlValue::Enum(DatabaseEnum {
                type_name: "order_status".to_string(),
                value: "Pending".to_string(),
            })
        );
    }

    #[test]
    fn default_dialect_reports_enums_unsupported() {
        let err = DefaultDialect
            .create_database_enum(&OrderStatus::Pending)
            .unwrap_err();
        assert!(matches!(err, DatabaseError::UnsupportedOperation { .. }));
    }

    #[test]
    fn placeholders_follow_the_dialect() {
        assert_eq!(DefaultDialect.placeholder(1), "?");
        assert_eq!(PostgresDialect.placeholder(2), "$2");
        assert_eq!(MySqlDialect.quote_char(), '`');
    }

    #[test]
    fn detection_by_url_scheme() {
        assert_eq!(detect("postgres://localhost/app").name(), "postgresql");
        assert_eq!(detect("mysql://localhost/app").name(), "mysql");
        assert_eq!(detect("sqlite::memory:").name(), "sqlite");
        assert_eq!(detect("jdbc:weird:thing").name(), "generic");
    }
}
