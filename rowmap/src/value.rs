use std::any::Any;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::TypeKey;

/// Owned, driver-neutral representation of a single database value.
///
/// Backend drivers decode result columns into this enum and accept it for
/// parameter binding. Conversions toward the database always end here.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
    Enum(DatabaseEnum),
}

/// A database-native enum value tagged with its database-side type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseEnum {
    pub type_name: String,
    pub value: String,
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Runtime type of the payload; `None` for NULL.
    pub fn type_key(&self) -> Option<TypeKey> {
        match self {
            SqlValue::Null => None,
            SqlValue::Bool(_) => Some(TypeKey::of::<bool>()),
            SqlValue::Int(_) => Some(TypeKey::of::<i64>()),
            SqlValue::Double(_) => Some(TypeKey::of::<f64>()),
            SqlValue::Text(_) => Some(TypeKey::of::<String>()),
            SqlValue::Bytes(_) => Some(TypeKey::of::<Vec<u8>>()),
            SqlValue::Timestamp(_) => Some(TypeKey::of::<DateTime<Utc>>()),
            SqlValue::Uuid(_) => Some(TypeKey::of::<Uuid>()),
            SqlValue::Json(_) => Some(TypeKey::of::<serde_json::Value>()),
            SqlValue::Enum(_) => Some(TypeKey::of::<DatabaseEnum>()),
        }
    }

    /// Consume the value, yielding its runtime type and type-erased payload.
    pub(crate) fn into_payload(self) -> Option<(TypeKey, Box<dyn Any + Send + Sync>)> {
        match self {
            SqlValue::Null => None,
            SqlValue::Bool(v) => Some((TypeKey::of::<bool>(), Box::new(v))),
            SqlValue::Int(v) => Some((TypeKey::of::<i64>(), Box::new(v))),
            SqlValue::Double(v) => Some((TypeKey::of::<f64>(), Box::new(v))),
            SqlValue::Text(v) => Some((TypeKey::of::<String>(), Box::new(v))),
            SqlValue::Bytes(v) => Some((TypeKey::of::<Vec<u8>>(), Box::new(v))),
            SqlValue::Timestamp(v) => Some((TypeKey::of::<DateTime<Utc>>(), Box::new(v))),
            SqlValue::Uuid(v) => Some((TypeKey::of::<Uuid>(), Box::new(v))),
            SqlValue::Json(v) => Some((TypeKey::of::<serde_json::Value>(), Box::new(v))),
            SqlValue::Enum(v) => Some((TypeKey::of::<DatabaseEnum>(), Box::new(v))),
        }
    }
}

macro_rules! sql_value_from {
    ($($ty:ty => $variant:ident ($conv:expr)),+ $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(value: $ty) -> Self {
                    SqlValue::$variant(($conv)(value))
                }
            }
        )+
    };
}

sql_value_from! {
    bool => Bool(|v| v),
    i8 => Int(i64::from),
    i16 => Int(i64::from),
    i32 => Int(i64::from),
    i64 => Int(|v| v),
    u8 => Int(i64::from),
    u16 => Int(i64::from),
    u32 => Int(i64::from),
    f32 => Double(f64::from),
    f64 => Double(|v| v),
    &str => Text(str::to_string),
    String => Text(|v| v),
    Vec<u8> => Bytes(|v| v),
    &[u8] => Bytes(<[u8]>::to_vec),
    DateTime<Utc> => Timestamp(|v| v),
    Uuid => Uuid(|v| v),
    serde_json::Value => Json(|v| v),
    DatabaseEnum => Enum(|v| v),
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_impls_pick_the_right_variant() {
        assert_eq!(SqlValue::from(42i32), SqlValue::Int(42));
        assert_eq!(SqlValue::from("hi"), SqlValue::Text("hi".to_string()));
        assert_eq!(SqlValue::from(true), SqlValue::Bool(true));
        assert_eq!(SqlValue::from(1.5f32), SqlValue::Double(1.5));
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(7i64)), SqlValue::Int(7));
    }

    #[test]
    fn type_key_reports_payload_type() {
        assert_eq!(SqlValue::Int(1).type_key(), Some(TypeKey::of::<i64>()));
        assert_eq!(
            SqlValue::Text(String::new()).type_key(),
            Some(TypeKey::of::<String>())
        );
        assert_eq!(SqlValue::Null.type_key(), None);
    }

    #[test]
    fn payload_round_trips() {
        let (key, payload) = SqlValue::Int(9).into_payload().unwrap();
        assert_eq!(key, TypeKey::of::<i64>());
        assert_eq!(*payload.downcast::<i64>().unwrap(), 9);
        assert!(SqlValue::Null.into_payload().is_none());
    }
}
