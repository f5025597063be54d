//! The query-execution facade.

use std::any::Any;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::conversion::{AnyValue, Conversions, TypeConversionRegistry};
use crate::dialect::{DefaultDialect, Dialect};
use crate::driver::Driver;
use crate::enums::{DbEnum, EnumValue};
use crate::error::DatabaseError;
use crate::instantiation::{FromRow, Row};
use crate::types::TypeKey;
use crate::value::{DatabaseEnum, SqlValue};

/// A type-erased query parameter.
pub enum Parameter {
    /// A value already in driver-native form.
    Value(SqlValue),
    /// A model value resolved through the registered to-database
    /// conversions at bind time.
    Model(Box<dyn Any + Send + Sync>, TypeKey),
    /// An enum constant. Resolution order: registered conversion, the
    /// dialect's native representation, the symbolic name as text.
    Enum(Box<dyn EnumValue>),
}

impl Parameter {
    /// A model value of a type with a registered to-database conversion.
    pub fn model<T: Send + Sync + 'static>(value: T) -> Self {
        Parameter::Model(Box::new(value), TypeKey::of::<T>())
    }

    /// An enum constant.
    pub fn enumeration<T: DbEnum>(value: T) -> Self {
        Parameter::Enum(Box::new(value))
    }
}

macro_rules! parameter_from {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for Parameter {
                fn from(value: $ty) -> Self {
                    Parameter::Value(value.into())
                }
            }
        )+
    };
}

parameter_from!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    f32,
    f64,
    &str,
    String,
    Vec<u8>,
    &[u8],
    DateTime<Utc>,
    Uuid,
    serde_json::Value,
    DatabaseEnum,
    SqlValue,
);

impl<T: Into<SqlValue>> From<Option<T>> for Parameter {
    fn from(value: Option<T>) -> Self {
        Parameter::Value(value.into())
    }
}

/// Build a `Vec<Parameter>` from driver-native values.
///
/// ```ignore
/// db.update("insert into users (name, age) values (?, ?)", &params!["alice", 32]).await?;
/// ```
#[macro_export]
macro_rules! params {
    () => { Vec::<$crate::Parameter>::new() };
    ($($value:expr),+ $(,)?) => { vec![$( $crate::Parameter::from($value) ),+] };
}

/// The main facade for executing queries.
///
/// Cheap to clone; all clones share the driver, dialect, and the frozen
/// conversion map, so a `Database` can be handed to any number of tasks.
#[derive(Clone)]
pub struct Database {
    driver: Arc<dyn Driver>,
    dialect: Arc<dyn Dialect>,
    conversions: Arc<Conversions>,
}

impl Database {
    /// Start building a database on top of the given driver.
    pub fn builder(driver: Arc<dyn Driver>) -> DatabaseBuilder {
        DatabaseBuilder::new(driver)
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    /// Execute a query and map every result row to `T`.
    pub async fn find_all<T: FromRow>(
        &self,
        sql: &str,
        params: &[Parameter],
    ) -> Result<Vec<T>, DatabaseError> {
        let rows = self.query_rows(sql, params).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Execute a query expected to match at most one row.
    pub async fn find_optional<T: FromRow>(
        &self,
        sql: &str,
        params: &[Parameter],
    ) -> Result<Option<T>, DatabaseError> {
        let rows = self.query_rows(sql, params).await?;
        match rows.len() {
            0 => Ok(None),
            1 => T::from_row(&rows[0]).map(Some),
            count => Err(DatabaseError::NonUniqueResult { count }.with_query(sql)),
        }
    }

    /// Execute a query expected to match exactly one row.
    pub async fn find_unique<T: FromRow>(
        &self,
        sql: &str,
        params: &[Parameter],
    ) -> Result<T, DatabaseError> {
        let rows = self.query_rows(sql, params).await?;
        match rows.len() {
            0 => Err(DatabaseError::EmptyResult.with_query(sql)),
            1 => T::from_row(&rows[0]),
            count => Err(DatabaseError::NonUniqueResult { count }.with_query(sql)),
        }
    }

    /// Execute an insert/update/delete, returning the affected row count.
    pub async fn update(&self, sql: &str, params: &[Parameter]) -> Result<u64, DatabaseError> {
        let bound = self.bind_parameters(params)?;
        tracing::debug!(sql, params = bound.len(), "executing update");
        self.driver
            .execute(sql, &bound)
            .await
            .map_err(|err| err.with_query(sql))
    }

    /// Execute a statement once per parameter set, returning the affected
    /// count of each execution.
    pub async fn update_batch(
        &self,
        sql: &str,
        batches: &[Vec<Parameter>],
    ) -> Result<Vec<u64>, DatabaseError> {
        let mut bound = Vec::with_capacity(batches.len());
        for params in batches {
            bound.push(self.bind_parameters(params)?);
        }
        tracing::debug!(sql, batches = bound.len(), "executing batch update");
        self.driver
            .execute_batch(sql, &bound)
            .await
            .map_err(|err| err.with_query(sql))
    }

    /// Execute a parameterless statement.
    pub async fn execute(&self, sql: &str) -> Result<u64, DatabaseError> {
        self.update(sql, &[]).await
    }

    async fn query_rows(
        &self,
        sql: &str,
        params: &[Parameter],
    ) -> Result<Vec<Row>, DatabaseError> {
        let bound = self.bind_parameters(params)?;
        tracing::debug!(sql, params = bound.len(), "executing query");
        let result = self
            .driver
            .query(sql, &bound)
            .await
            .map_err(|err| err.with_query(sql))?;
        let columns = Arc::new(result.columns);
        Ok(result
            .rows
            .into_iter()
            .map(|values| Row::new(Arc::clone(&columns), values, Arc::clone(&self.conversions)))
            .collect())
    }

    fn bind_parameters(&self, params: &[Parameter]) -> Result<Vec<SqlValue>, DatabaseError> {
        params.iter().map(|param| self.bind_parameter(param)).collect()
    }

    /// Resolve one parameter into its driver-native value.
    fn bind_parameter(&self, param: &Parameter) -> Result<SqlValue, DatabaseError> {
        match param {
            Parameter::Value(value) => Ok(value.clone()),
            Parameter::Model(value, key) => match self.conversions.find_to_database(*key) {
                Some(conversion) => downcast_sql_value(conversion.apply(value.as_ref())?),
                None => Err(DatabaseError::NoConversion {
                    source: key.name(),
                    target: "database value",
                }),
            },
            Parameter::Enum(value) => {
                if let Some(conversion) = self.conversions.find_to_database(value.type_key()) {
                    return downcast_sql_value(conversion.apply(value.as_any())?);
                }
                if self.dialect.supports_native_enums() {
                    // Construction failures (e.g. a malformed type name)
                    // propagate; they are not swallowed.
                    self.dialect.create_database_enum(value.as_ref())
                } else {
                    Ok(SqlValue::Text(value.constant_name().to_string()))
                }
            }
        }
    }
}

fn downcast_sql_value(value: AnyValue) -> Result<SqlValue, DatabaseError> {
    value.downcast::<SqlValue>().map(|boxed| *boxed).map_err(|_| {
        DatabaseError::Configuration(
            "to-database conversion did not produce a database value".to_string(),
        )
    })
}

/// Assembles a [`Database`]: configure conversions and the dialect, then
/// freeze. Once `build` returns, the conversion registry is immutable.
pub struct DatabaseBuilder {
    driver: Arc<dyn Driver>,
    dialect: Arc<dyn Dialect>,
    registry: TypeConversionRegistry,
}

impl DatabaseBuilder {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        DatabaseBuilder {
            driver,
            dialect: Arc::new(DefaultDialect),
            registry: TypeConversionRegistry::with_defaults(),
        }
    }

    /// Replace the default conversion stock with an empty registry.
    pub fn without_default_conversions(mut self) -> Self {
        self.registry = TypeConversionRegistry::new();
        self
    }

    pub fn dialect(mut self, dialect: Arc<dyn Dialect>) -> Self {
        self.dialect = dialect;
        self
    }

    /// Register custom type conversions. May be called several times.
    pub fn configure_conversions(
        mut self,
        configure: impl FnOnce(&mut TypeConversionRegistry),
    ) -> Self {
        configure(&mut self.registry);
        self
    }

    /// Freeze the conversion registry and produce the shared facade.
    pub fn build(self) -> Database {
        Database {
            driver: self.driver,
            dialect: self.dialect,
            conversions: Arc::new(self.registry.freeze()),
        }
    }
}
