//! Realizing result-row values as model values.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::conversion::Conversions;
use crate::error::DatabaseError;
use crate::types::TypeKey;
use crate::value::{DatabaseEnum, SqlValue};

/// A single result row: column names, values, and the conversions in effect.
#[derive(Clone)]
pub struct Row {
    columns: Arc<Vec<String>>,
    values: Vec<SqlValue>,
    conversions: Arc<Conversions>,
}

impl Row {
    pub(crate) fn new(
        columns: Arc<Vec<String>>,
        values: Vec<SqlValue>,
        conversions: Arc<Conversions>,
    ) -> Self {
        Row {
            columns,
            values,
            conversions,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The raw value at `index`, without conversion.
    pub fn value(&self, index: usize) -> Result<&SqlValue, DatabaseError> {
        self.values.get(index).ok_or_else(|| {
            DatabaseError::Configuration(format!(
                "column index {index} out of bounds ({} columns)",
                self.values.len()
            ))
        })
    }

    /// Read a column, converting it to the requested type.
    ///
    /// NULL values are rejected; use [`get_opt`](Self::get_opt) for
    /// optional columns.
    pub fn get<T: Send + Sync + 'static>(&self, index: usize) -> Result<T, DatabaseError> {
        convert_value(self.value(index)?, &self.conversions)
    }

    /// Read a possibly-NULL column.
    pub fn get_opt<T: Send + Sync + 'static>(
        &self,
        index: usize,
    ) -> Result<Option<T>, DatabaseError> {
        let value = self.value(index)?;
        if value.is_null() {
            return Ok(None);
        }
        convert_value(value, &self.conversions).map(Some)
    }

    /// Read a column by name.
    pub fn get_by_name<T: Send + Sync + 'static>(&self, name: &str) -> Result<T, DatabaseError> {
        let index = self
            .columns
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| DatabaseError::Configuration(format!("no column named `{name}`")))?;
        self.get(index)
    }
}

/// Realize a database value as an instance of the requested type.
///
/// Identity requests short-circuit; everything else goes through the
/// conversion map. An absent conversion becomes a descriptive error naming
/// the source/target pair.
pub(crate) fn convert_value<T: Send + Sync + 'static>(
    value: &SqlValue,
    conversions: &Conversions,
) -> Result<T, DatabaseError> {
    let target = TypeKey::of::<T>();
    match value.clone().into_payload() {
        None => Err(DatabaseError::NullValue {
            target: target.name(),
        }),
        Some((source, payload)) => {
            if source == target {
                return payload.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
                    DatabaseError::Configuration(format!(
                        "runtime type of value does not match `{}`",
                        target.name()
                    ))
                });
            }
            match conversions.find_from_database(source, target) {
                Some(conversion) => conversion
                    .apply(payload.as_ref())?
                    .downcast::<T>()
                    .map(|boxed| *boxed)
                    .map_err(|_| {
                        DatabaseError::Configuration(format!(
                            "conversion from `{}` to `{}` produced a value of another type",
                            source.name(),
                            target.name()
                        ))
                    }),
                None => Err(DatabaseError::NoConversion {
                    source: source.name(),
                    target: target.name(),
                }),
            }
        }
    }
}

/// Trait for types that can be instantiated from a result row.
///
/// Implemented for scalars (single-column rows), their `Option` forms, and
/// tuples up to arity five. Model structs implement it by hand:
///
/// ```ignore
/// impl FromRow for User {
///     fn from_row(row: &Row) -> Result<Self, DatabaseError> {
///         Ok(User {
///             id: row.get(0)?,
///             name: row.get(1)?,
///             email: row.get_opt(2)?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self, DatabaseError>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> Result<Self, DatabaseError> {
        Ok(row.clone())
    }
}

/// A single column read, used by the scalar and tuple [`FromRow`] forms.
///
/// Implemented for the driver-native scalars and their `Option` forms.
/// Custom model types can opt in with a one-line impl delegating to
/// [`Row::get`].
pub trait FromColumn: Sized {
    fn from_column(row: &Row, index: usize) -> Result<Self, DatabaseError>;
}

macro_rules! scalar_from_column {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FromColumn for $ty {
                fn from_column(row: &Row, index: usize) -> Result<Self, DatabaseError> {
                    row.get(index)
                }
            }

            impl FromColumn for Option<$ty> {
                fn from_column(row: &Row, index: usize) -> Result<Self, DatabaseError> {
                    row.get_opt(index)
                }
            }

            impl FromRow for $ty {
                fn from_row(row: &Row) -> Result<Self, DatabaseError> {
                    row.get(0)
                }
            }

            impl FromRow for Option<$ty> {
                fn from_row(row: &Row) -> Result<Self, DatabaseError> {
                    row.get_opt(0)
                }
            }
        )+
    };
}

scalar_from_column!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    f32,
    f64,
    String,
    Vec<u8>,
    DateTime<Utc>,
    Uuid,
    serde_json::Value,
    DatabaseEnum,
);

macro_rules! tuple_from_row {
    ($( ($($name:ident : $index:tt),+) ),+ $(,)?) => {
        $(
            impl<$($name),+> FromRow for ($($name,)+)
            where
                $($name: FromColumn),+
            {
                fn from_row(row: &Row) -> Result<Self, DatabaseError> {
                    Ok(($($name::from_column(row, $index)?,)+))
                }
            }
        )+
    };
}

tuple_from_row!(
    (A: 0),
    (A: 0, B: 1),
    (A: 0, B: 1, C: 2),
    (A: 0, B: 1, C: 2, D: 3),
    (A: 0, B: 1, C: 2, D: 3, E: 4),
);
