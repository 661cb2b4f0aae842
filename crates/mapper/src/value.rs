//! # Values
//!
//! Column values as read from a row, the kinds members declare, and the traits that move values
//! in and out of typed fields.

use std::fmt::{self, Debug, Display, Formatter};

use base64ct::{Base64, Encoding};
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// A single column value read from a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL `NULL`.
    Null,
    /// Boolean.
    Bool(bool),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 32-bit unsigned integer.
    Uint32(u32),
    /// 64-bit unsigned integer.
    Uint64(u64),
    /// Single precision float.
    Float(f32),
    /// Double precision float.
    Double(f64),
    /// Text.
    Str(String),
    /// Raw bytes.
    Binary(Vec<u8>),
    /// Calendar date.
    Date(NaiveDate),
    /// Point in time, normalized to UTC.
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Name of the value's type, as used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int32(_) => "int32",
            Self::Int64(_) => "int64",
            Self::Uint32(_) => "uint32",
            Self::Uint64(_) => "uint64",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Str(_) => "string",
            Self::Binary(_) => "binary",
            Self::Date(_) => "date",
            Self::Timestamp(_) => "timestamp",
        }
    }

    /// Value and type, for error reports.
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Str(s) => format!("{s:?} ({})", self.type_name()),
            other => format!("{other} ({})", other.type_name()),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Uint32(v) => write!(f, "{v}"),
            Self::Uint64(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v}"),
            Self::Binary(v) => write!(f, "{}", Base64::encode_string(v)),
            Self::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Self::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

// Schema-less output
impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(v) => Self::Bool(v),
            Value::Int32(v) => Self::Number(v.into()),
            Value::Int64(v) => Self::Number(v.into()),
            Value::Uint32(v) => Self::Number(v.into()),
            Value::Uint64(v) => Self::Number(v.into()),
            Value::Float(v) => {
                serde_json::Number::from_f64(f64::from(v)).map_or(Self::Null, Self::Number)
            }
            Value::Double(v) => serde_json::Number::from_f64(v).map_or(Self::Null, Self::Number),
            Value::Str(v) => Self::String(v),
            Value::Binary(v) => Self::String(Base64::encode_string(&v)),
            Value::Date(v) => Self::String(v.format("%Y-%m-%d").to_string()),
            Value::Timestamp(v) => Self::String(v.to_rfc3339()),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i32 => Int32,
    i64 => Int64,
    u32 => Uint32,
    u64 => Uint64,
    f32 => Float,
    f64 => Double,
    String => Str,
    Vec<u8> => Binary,
    NaiveDate => Date,
    DateTime<Utc> => Timestamp,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Target type of a scalar member or constructor parameter.
///
/// A member accepts a [`Value`] directly only when [`Kind::accepts`] holds; anything else goes
/// through the conversion fallback.
#[derive(Clone, Copy)]
pub enum Kind {
    /// `bool`
    Bool,
    /// `i32`
    Int32,
    /// `i64`
    Int64,
    /// `u32`
    Uint32,
    /// `u64`
    Uint64,
    /// `f32`
    Float,
    /// `f64`
    Double,
    /// `String`
    Str,
    /// `Vec<u8>`
    Binary,
    /// `NaiveDate`
    Date,
    /// `DateTime<Utc>`
    Timestamp,
    /// An enum declared with [`value_enum!`](crate::value_enum), stored as its `i64`
    /// representation.
    Enum(EnumKind),
}

/// Describes an enum target for the conversion fallback.
#[derive(Clone, Copy)]
pub struct EnumKind {
    /// The enum's type name.
    pub name: &'static str,
    /// Maps a variant name to its representation.
    pub from_name: fn(&str) -> Option<i64>,
}

impl Kind {
    /// Name of the kind, as used in error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Float => "float",
            Self::Double => "double",
            Self::Str => "string",
            Self::Binary => "binary",
            Self::Date => "date",
            Self::Timestamp => "timestamp",
            Self::Enum(e) => e.name,
        }
    }

    /// Whether a non-null value can be assigned without conversion.
    #[must_use]
    pub const fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Bool, Value::Bool(_))
                | (Self::Int32, Value::Int32(_))
                | (Self::Int64 | Self::Enum(_), Value::Int64(_))
                | (Self::Uint32, Value::Uint32(_))
                | (Self::Uint64, Value::Uint64(_))
                | (Self::Float, Value::Float(_))
                | (Self::Double, Value::Double(_))
                | (Self::Str, Value::Str(_))
                | (Self::Binary, Value::Binary(_))
                | (Self::Date, Value::Date(_))
                | (Self::Timestamp, Value::Timestamp(_))
        )
    }
}

impl Debug for Kind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Debug for EnumKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumKind").field("name", &self.name).finish_non_exhaustive()
    }
}

/// A value could not be assigned to its target without conversion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expected {expected} value, found {found}")]
pub struct TypeMismatch {
    /// What the target accepts.
    pub expected: &'static str,
    /// What was supplied.
    pub found: &'static str,
}

impl TypeMismatch {
    /// Mismatch between the expected type and the supplied value.
    #[must_use]
    pub const fn new(expected: &'static str, found: &Value) -> Self {
        Self {
            expected,
            found: found.type_name(),
        }
    }
}

/// Types that can be assigned from a column value.
///
/// `from_value` must accept exactly the values [`Kind::accepts`] allows for `KIND` (plus
/// `Null` for optional types): the mapper relies on it to decide when to fall back to conversion.
pub trait FromValue: Sized {
    /// The target kind used to select a conversion.
    const KIND: Kind;

    /// Take ownership of a value of the expected type.
    ///
    /// # Errors
    ///
    /// Returns a [`TypeMismatch`] when the value has another type.
    fn from_value(value: Value) -> Result<Self, TypeMismatch>;
}

/// Types that can be read back as a column value, e.g. to build loader keys.
pub trait IntoValue {
    /// Copy the field out as a [`Value`].
    fn to_value(&self) -> Value;
}

macro_rules! scalar {
    ($ty:ty, $variant:ident, copy) => {
        scalar!(@from $ty, $variant);

        impl IntoValue for $ty {
            fn to_value(&self) -> Value {
                Value::$variant(*self)
            }
        }
    };
    ($ty:ty, $variant:ident, clone) => {
        scalar!(@from $ty, $variant);

        impl IntoValue for $ty {
            fn to_value(&self) -> Value {
                Value::$variant(self.clone())
            }
        }
    };
    (@from $ty:ty, $variant:ident) => {
        impl FromValue for $ty {
            const KIND: Kind = Kind::$variant;

            fn from_value(value: Value) -> Result<Self, TypeMismatch> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(TypeMismatch::new(Self::KIND.name(), &other)),
                }
            }
        }
    };
}

scalar!(bool, Bool, copy);
scalar!(i32, Int32, copy);
scalar!(i64, Int64, copy);
scalar!(u32, Uint32, copy);
scalar!(u64, Uint64, copy);
scalar!(f32, Float, copy);
scalar!(f64, Double, copy);
scalar!(String, Str, clone);
scalar!(Vec<u8>, Binary, clone);
scalar!(NaiveDate, Date, copy);
scalar!(DateTime<Utc>, Timestamp, copy);

impl<T: FromValue> FromValue for Option<T> {
    const KIND: Kind = T::KIND;

    fn from_value(value: Value) -> Result<Self, TypeMismatch> {
        if value.is_null() { Ok(None) } else { T::from_value(value).map(Some) }
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, IntoValue::to_value)
    }
}

/// Declares an enum that can be mapped from integer or variant-name columns.
///
/// # Examples
///
/// ```ignore
/// value_enum! {
///     #[doc = "Order lifecycle."]
///     pub enum OrderStatus {
///         Pending = 0,
///         Shipped = 1,
///     }
/// }
/// ```
#[macro_export]
macro_rules! value_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident = $repr:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant = $repr
            ),*
        }

        impl $name {
            #[doc(hidden)]
            fn repr_from_name(name: &str) -> ::std::option::Option<i64> {
                $(
                    if name == stringify!($variant) {
                        return ::std::option::Option::Some($repr);
                    }
                )*
                ::std::option::Option::None
            }
        }

        impl $crate::FromValue for $name {
            const KIND: $crate::Kind = $crate::Kind::Enum($crate::EnumKind {
                name: stringify!($name),
                from_name: Self::repr_from_name,
            });

            fn from_value(
                value: $crate::Value,
            ) -> ::std::result::Result<Self, $crate::TypeMismatch> {
                match value {
                    $( $crate::Value::Int64($repr) => ::std::result::Result::Ok(Self::$variant), )*
                    other => ::std::result::Result::Err($crate::TypeMismatch::new(
                        stringify!($name),
                        &other,
                    )),
                }
            }
        }

        impl $crate::IntoValue for $name {
            fn to_value(&self) -> $crate::Value {
                $crate::Value::Int64(*self as i64)
            }
        }
    };
}
