use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::map::ConversionMap;
use super::{AnyValue, TypeConversion};
use crate::enums::DbEnum;
use crate::error::DatabaseError;
use crate::types::TypeKey;
use crate::value::{DatabaseEnum, SqlValue};

/// Registry containing the type-conversions used when converting database
/// values to model values and vice versa.
///
/// Registration happens during startup, before the registry is frozen into
/// a [`Conversions`] view by [`DatabaseBuilder::build`](crate::DatabaseBuilder::build).
/// The frozen view is shared read-only across all query operations, so no
/// registration is possible once execution begins.
pub struct TypeConversionRegistry {
    map: ConversionMap,
}

impl TypeConversionRegistry {
    /// An empty registry without the default conversion stock.
    pub fn new() -> Self {
        TypeConversionRegistry {
            map: ConversionMap::default(),
        }
    }

    /// A registry pre-populated with the default conversions: checked
    /// numeric narrowing, float widening, text parses to [`Uuid`],
    /// timestamps and JSON, and the reverse widenings for binding.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_default_conversions();
        registry
    }

    /// Registers a conversion from the given source database type to the
    /// given target model type.
    pub fn register_conversion_from_database<S, T>(
        &mut self,
        conversion: impl Fn(&S) -> T + Send + Sync + 'static,
    ) where
        S: Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        self.map.register(TypeConversion::new(conversion));
    }

    /// Registers a conversion from database type to model type that may
    /// reject individual values. The failure surfaces at row-mapping time.
    pub fn register_fallible_conversion_from_database<S, T>(
        &mut self,
        conversion: impl Fn(&S) -> Result<T, DatabaseError> + Send + Sync + 'static,
    ) where
        S: Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        self.map.register(TypeConversion::fallible(conversion));
    }

    /// Registers a conversion from the given model type to a driver-native
    /// database value, used when binding query parameters.
    pub fn register_conversion_to_database<S, V>(
        &mut self,
        conversion: impl Fn(&S) -> V + Send + Sync + 'static,
    ) where
        S: Send + Sync + 'static,
        V: Into<SqlValue> + 'static,
    {
        self.map
            .register(TypeConversion::fallible::<S, SqlValue, _>(move |value| {
                Ok(conversion(value).into())
            }));
    }

    /// Registers conversions from database type to model type and back.
    pub fn register_conversions<D, T>(
        &mut self,
        from_database: impl Fn(&D) -> T + Send + Sync + 'static,
        to_database: impl Fn(&T) -> D + Send + Sync + 'static,
    ) where
        D: Into<SqlValue> + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        self.register_conversion_from_database(from_database);
        self.register_conversion_to_database(to_database);
    }

    /// Registers a conversion keyed on explicit type descriptors, reading
    /// direction. The function receives the raw erased value; use this when
    /// the source key is a declared supertype or interface of the actual
    /// value types.
    pub fn register_erased_conversion_from_database(
        &mut self,
        source: TypeKey,
        target: TypeKey,
        conversion: impl Fn(&(dyn Any + Send + Sync)) -> Result<AnyValue, DatabaseError>
            + Send
            + Sync
            + 'static,
    ) {
        self.map
            .register(TypeConversion::erased(source, target, conversion));
    }

    /// Declares `Sub` a subtype of `Sup` in the type-descriptor graph.
    pub fn declare_supertype<Sub: ?Sized + 'static, Sup: ?Sized + 'static>(&mut self) {
        self.map
            .declare_supertype(TypeKey::of::<Sub>(), TypeKey::of::<Sup>());
    }

    /// Declares that `T` implements the interface `I` (typically a
    /// `dyn Trait`) in the type-descriptor graph.
    pub fn declare_interface<T: ?Sized + 'static, I: ?Sized + 'static>(&mut self) {
        self.map
            .declare_interface(TypeKey::of::<T>(), TypeKey::of::<I>());
    }

    /// Registers a simple enum conversion that uses `key_function` to
    /// produce the saved value and uses the same function on the enum's
    /// constants to convert stored keys back.
    ///
    /// A stored key that matches no constant fails at row-mapping time with
    /// [`DatabaseError::UnmatchedEnumKey`].
    pub fn register_enum_conversion<T, K>(
        &mut self,
        key_function: impl Fn(&T) -> K + Send + Sync + 'static,
    ) where
        T: DbEnum,
        K: PartialEq + fmt::Debug + Into<SqlValue> + Send + Sync + 'static,
    {
        let key_function = Arc::new(key_function);

        let to_database = Arc::clone(&key_function);
        self.map
            .register(TypeConversion::fallible::<T, SqlValue, _>(move |value| {
                Ok(to_database(value).into())
            }));

        self.map
            .register(TypeConversion::fallible::<K, T, _>(move |stored| {
                T::VALUES
                    .iter()
                    .find(|constant| key_function(constant) == *stored)
                    .cloned()
                    .ok_or_else(|| DatabaseError::UnmatchedEnumKey {
                        enum_type: T::type_name(),
                        key: format!("{stored:?}"),
                    })
            }));
    }

    /// Registers the given enum type to be saved as a database-native enum
    /// of the given type name, keyed by the constants' symbolic names.
    pub fn register_native_enum_conversion<T: DbEnum>(&mut self, type_name: &str) {
        self.register_native_enum_conversion_with(type_name, |constant: &T| {
            constant.name().to_string()
        });
    }

    /// Registers the given enum type to be saved as a database-native enum
    /// of the given type name. The key function maps each constant to its
    /// stored value.
    pub fn register_native_enum_conversion_with<T: DbEnum>(
        &mut self,
        type_name: &str,
        key_function: impl Fn(&T) -> String + Send + Sync + 'static,
    ) {
        let key_function = Arc::new(key_function);
        let type_name = type_name.to_string();

        let writer = Arc::clone(&key_function);
        self.map
            .register(TypeConversion::fallible::<T, SqlValue, _>(move |value| {
                Ok(SqlValue::Enum(DatabaseEnum {
                    type_name: type_name.clone(),
                    value: writer(value),
                }))
            }));

        let from_text = Arc::clone(&key_function);
        self.map
            .register(TypeConversion::fallible::<String, T, _>(move |stored| {
                match_enum_key(stored, &*from_text)
            }));

        self.map
            .register(TypeConversion::fallible::<DatabaseEnum, T, _>(move |stored| {
                match_enum_key(&stored.value, &*key_function)
            }));
    }

    fn register_default_conversions(&mut self) {
        macro_rules! narrowing {
            ($registry:expr, $($ty:ty),+) => {
                $(
                    $registry.register_fallible_conversion_from_database(|value: &i64| {
                        <$ty>::try_from(*value).map_err(|_| {
                            DatabaseError::Conversion(format!(
                                "value {value} out of range for {}",
                                stringify!($ty)
                            ))
                        })
                    });
                    $registry.register_conversion_to_database(|value: &$ty| i64::from(*value));
                )+
            };
        }

        narrowing!(self, i8, i16, i32, u8, u16, u32);

        self.register_fallible_conversion_from_database(|value: &i64| {
            u64::try_from(*value).map_err(|_| {
                DatabaseError::Conversion(format!("value {value} out of range for u64"))
            })
        });
        self.map
            .register(TypeConversion::fallible::<u64, SqlValue, _>(|value| {
                i64::try_from(*value)
                    .map(SqlValue::Int)
                    .map_err(|_| {
                        DatabaseError::Conversion(format!("value {value} out of range for i64"))
                    })
            }));

        self.register_conversion_from_database(|value: &i64| *value as f64);
        self.register_conversion_from_database(|value: &f64| *value as f32);
        self.register_conversion_to_database(|value: &f32| f64::from(*value));

        self.register_fallible_conversion_from_database(|value: &i64| match *value {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DatabaseError::Conversion(format!(
                "value {other} is not a boolean"
            ))),
        });

        self.register_fallible_conversion_from_database(|value: &String| {
            Uuid::parse_str(value)
                .map_err(|err| DatabaseError::Conversion(format!("invalid uuid `{value}`: {err}")))
        });
        self.register_fallible_conversion_from_database(|value: &String| {
            DateTime::parse_from_rfc3339(value)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|err| {
                    DatabaseError::Conversion(format!("invalid timestamp `{value}`: {err}"))
                })
        });
        self.register_fallible_conversion_from_database(|value: &String| {
            serde_json::from_str::<serde_json::Value>(value)
                .map_err(|err| DatabaseError::Conversion(format!("invalid json: {err}")))
        });

        self.register_conversion_from_database(|value: &DatabaseEnum| value.value.clone());
        self.register_conversion_from_database(|value: &Uuid| value.to_string());
    }

    /// Freeze the registry into the immutable view shared by rows and
    /// query operations.
    pub fn freeze(self) -> Conversions {
        Conversions { map: self.map }
    }
}

impl Default for TypeConversionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn match_enum_key<T: DbEnum>(
    stored: &str,
    key_function: &(dyn Fn(&T) -> String + Send + Sync),
) -> Result<T, DatabaseError> {
    T::VALUES
        .iter()
        .find(|constant| key_function(constant) == stored)
        .cloned()
        .ok_or_else(|| DatabaseError::UnmatchedEnumKey {
            enum_type: T::type_name(),
            key: format!("{stored:?}"),
        })
}

/// Immutable view of the registered conversions, produced by
/// [`TypeConversionRegistry::freeze`] and shared via `Arc`.
pub struct Conversions {
    map: ConversionMap,
}

impl Conversions {
    /// Conversion for reading a database value of runtime type `source`
    /// into a model value of type `target`.
    pub(crate) fn find_from_database(
        &self,
        source: TypeKey,
        target: TypeKey,
    ) -> Option<&TypeConversion> {
        self.map.find_conversion(source, target)
    }

    /// Conversion for binding a model value of type `source` as a
    /// driver-native database value.
    pub(crate) fn find_to_database(&self, source: TypeKey) -> Option<&TypeConversion> {
        self.map.find_conversion(source, TypeKey::of::<SqlValue>())
    }
}
