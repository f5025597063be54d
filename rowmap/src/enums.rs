use std::any::Any;

use crate::types::TypeKey;

/// A model enum participating in database conversion.
///
/// Supplies what runtime reflection supplies elsewhere: the constant list,
/// each constant's symbolic name, and the type's simple name. Usually
/// implemented through [`db_enum!`](crate::db_enum).
pub trait DbEnum: Clone + Send + Sync + Sized + 'static {
    /// All constants, in declaration order.
    const VALUES: &'static [Self];

    /// The declared symbolic name of this constant.
    fn name(&self) -> &'static str;

    /// The simple type name, e.g. `OrderStatus`.
    fn type_name() -> &'static str;
}

/// Object-safe view of a single enum constant, used by dialects and
/// parameter binding.
pub trait EnumValue: Send + Sync {
    fn enum_type_name(&self) -> &'static str;
    fn constant_name(&self) -> &'static str;
    fn type_key(&self) -> TypeKey;
    fn as_any(&self) -> &(dyn Any + Send + Sync);
}

impl<T: DbEnum> EnumValue for T {
    fn enum_type_name(&self) -> &'static str {
        T::type_name()
    }

    fn constant_name(&self) -> &'static str {
        self.name()
    }

    fn type_key(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }
}

/// Declare an enum together with its [`DbEnum`] implementation.
///
/// # Example
///
/// ```
/// rowmap::db_enum! {
///     pub enum OrderStatus { Pending, Shipped, Delivered }
/// }
/// ```
#[macro_export]
macro_rules! db_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis enum $name {
            $($variant),+
        }

        impl $crate::DbEnum for $name {
            const VALUES: &'static [Self] = &[$(Self::$variant),+];

            fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),+
                }
            }

            fn type_name() -> &'static str {
                stringify!($name)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::db_enum! {
        enum Color { Red, Green, Blue }
    }

    #[test]
    fn constants_and_names() {
        assert_eq!(Color::VALUES.len(), 3);
        assert_eq!(Color::Green.name(), "Green");
        assert_eq!(Color::type_name(), "Color");
    }

    #[test]
    fn erased_view_matches() {
        let value: &dyn EnumValue = &Color::Blue;
        assert_eq!(value.enum_type_name(), "Color");
        assert_eq!(value.constant_name(), "Blue");
        assert_eq!(value.type_key(), TypeKey::of::<Color>());
        assert!(value.as_any().downcast_ref::<Color>().is_some());
    }
}
