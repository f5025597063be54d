//! Type-conversion subsystem.
//!
//! Conversions adapt values crossing the database/model boundary in both
//! directions. They are registered on a [`TypeConversionRegistry`] during
//! startup, then frozen into an immutable [`Conversions`] view that rows and
//! query operations share. Lookup is polymorphic: a conversion registered
//! for a declared supertype or interface applies to any of its subtypes.

mod map;
mod registry;

pub use registry::{Conversions, TypeConversionRegistry};

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use crate::error::DatabaseError;
use crate::types::TypeKey;

/// Type-erased value flowing through conversion functions.
pub type AnyValue = Box<dyn Any + Send + Sync>;

type ConvertFn =
    Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Result<AnyValue, DatabaseError> + Send + Sync>;

/// An immutable conversion record between a source and a target type.
#[derive(Clone)]
pub struct TypeConversion {
    source: TypeKey,
    target: TypeKey,
    convert: ConvertFn,
}

impl TypeConversion {
    /// Conversion that cannot fail for values of its declared source type.
    pub fn new<S, T, F>(conversion: F) -> Self
    where
        S: Send + Sync + 'static,
        T: Send + Sync + 'static,
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        Self::fallible::<S, T, _>(move |value| Ok(conversion(value)))
    }

    /// Conversion that may reject individual values.
    ///
    /// Failures surface when the conversion is applied, never at
    /// registration time.
    pub fn fallible<S, T, F>(conversion: F) -> Self
    where
        S: Send + Sync + 'static,
        T: Send + Sync + 'static,
        F: Fn(&S) -> Result<T, DatabaseError> + Send + Sync + 'static,
    {
        TypeConversion {
            source: TypeKey::of::<S>(),
            target: TypeKey::of::<T>(),
            convert: Arc::new(move |value| {
                let value = value.downcast_ref::<S>().ok_or_else(|| {
                    DatabaseError::Configuration(format!(
                        "conversion from `{}` applied to a value of another type",
                        type_name::<S>()
                    ))
                })?;
                conversion(value).map(|out| Box::new(out) as AnyValue)
            }),
        }
    }

    /// Conversion keyed on explicit type descriptors; the function receives
    /// the raw erased value.
    ///
    /// Use this when the source key is a declared supertype or interface of
    /// the actual value types, so the function has to dispatch itself.
    pub fn erased(
        source: TypeKey,
        target: TypeKey,
        conversion: impl Fn(&(dyn Any + Send + Sync)) -> Result<AnyValue, DatabaseError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        TypeConversion {
            source,
            target,
            convert: Arc::new(conversion),
        }
    }

    pub fn source(&self) -> TypeKey {
        self.source
    }

    pub fn target(&self) -> TypeKey {
        self.target
    }

    /// Apply this conversion to a type-erased value.
    pub fn apply(&self, value: &(dyn Any + Send + Sync)) -> Result<AnyValue, DatabaseError> {
        (self.convert)(value)
    }
}

impl fmt::Debug for TypeConversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeConversion({} -> {})", self.source, self.target)
    }
}
