//! Conversion fallback used when a column value cannot be assigned directly.
//!
//! The conversion is chosen from the *target* kind only:
//!
//! | Target  | Source                 | Rule                                              |
//! |---------|------------------------|---------------------------------------------------|
//! | boolean | string                 | parse as integer, nonzero is `true`               |
//! | boolean | numeric                | nonzero is `true`                                 |
//! | enum    | string                 | exact variant name                                |
//! | enum    | numeric, boolean       | value reinterpreted as the representation         |
//! | other   | any                    | invariant conversion, see [`Conversion::apply`]   |
//!
//! Boolean strings such as `"true"` or `"yes"` are rejected.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use thiserror::Error;

use crate::value::{EnumKind, Kind, Value};

/// The fallback conversion selected for a node.
#[derive(Debug, Clone, Copy)]
pub enum Conversion {
    /// Boolean target.
    Bool,
    /// Enum target.
    Enum(EnumKind),
    /// Any other target.
    Invariant(Kind),
}

/// The fallback conversion failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot convert {from} to {to}: {reason}")]
pub struct ConversionError {
    /// Source value type.
    pub from: &'static str,
    /// Target kind.
    pub to: &'static str,
    /// What went wrong.
    pub reason: String,
}

impl Conversion {
    /// Select the conversion for a target kind.
    #[must_use]
    pub const fn for_target(kind: Kind) -> Self {
        match kind {
            Kind::Bool => Self::Bool,
            Kind::Enum(e) => Self::Enum(e),
            other => Self::Invariant(other),
        }
    }

    /// Convert a non-null value into the representation the target accepts.
    ///
    /// # Errors
    ///
    /// Returns a [`ConversionError`] when the value has no representation in the target kind.
    pub fn apply(&self, value: &Value) -> Result<Value, ConversionError> {
        match self {
            Self::Bool => to_bool(value),
            Self::Enum(e) => to_enum(*e, value),
            Self::Invariant(kind) => invariant(*kind, value),
        }
    }

    const fn target(&self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::Enum(e) => e.name,
            Self::Invariant(kind) => kind.name(),
        }
    }

    fn error(&self, value: &Value, reason: impl Into<String>) -> ConversionError {
        ConversionError {
            from: value.type_name(),
            to: self.target(),
            reason: reason.into(),
        }
    }
}

fn to_bool(value: &Value) -> Result<Value, ConversionError> {
    let conversion = Conversion::Bool;
    match value {
        Value::Str(raw) => raw
            .trim()
            .parse::<i64>()
            .map(|n| Value::Bool(n != 0))
            .map_err(|_e| conversion.error(value, format!("{raw:?} is not an integer"))),
        Value::Bool(v) => Ok(Value::Bool(*v)),
        Value::Float(v) => Ok(Value::Bool(*v != 0.0)),
        Value::Double(v) => Ok(Value::Bool(*v != 0.0)),
        other => integral(other)
            .map(|n| Value::Bool(n != 0))
            .map_err(|reason| conversion.error(value, reason)),
    }
}

fn to_enum(kind: EnumKind, value: &Value) -> Result<Value, ConversionError> {
    let conversion = Conversion::Enum(kind);
    match value {
        Value::Str(raw) => (kind.from_name)(raw)
            .map(Value::Int64)
            .ok_or_else(|| conversion.error(value, format!("no variant named {raw:?}"))),
        Value::Float(_) | Value::Double(_) => {
            Err(conversion.error(value, "floating point values have no enum representation"))
        }
        other => integral(other)
            .and_then(|n| i64::try_from(n).map_err(|e| e.to_string()))
            .map(Value::Int64)
            .map_err(|reason| conversion.error(value, reason)),
    }
}

/// Culture-invariant conversion between kinds.
///
/// - integers from any numeric, boolean (`0`/`1`) or integer string; floats round half to even;
///   out-of-range values fail
/// - floats from any numeric, boolean or numeric string
/// - strings from anything except binary via its display form; binary must be UTF-8
/// - binary from the bytes of a string
/// - dates from `%Y-%m-%d` strings or timestamps
/// - timestamps from RFC 3339 or `%Y-%m-%d %H:%M:%S%.f` strings, or dates at midnight UTC
fn invariant(kind: Kind, value: &Value) -> Result<Value, ConversionError> {
    let conversion = Conversion::Invariant(kind);
    let fail = |reason: String| conversion.error(value, reason);

    match kind {
        Kind::Bool => to_bool(value),
        Kind::Enum(e) => to_enum(e, value),
        Kind::Int32 => integral(value)
            .and_then(|n| i32::try_from(n).map_err(|e| e.to_string()))
            .map(Value::Int32)
            .map_err(fail),
        Kind::Int64 => integral(value)
            .and_then(|n| i64::try_from(n).map_err(|e| e.to_string()))
            .map(Value::Int64)
            .map_err(fail),
        Kind::Uint32 => integral(value)
            .and_then(|n| u32::try_from(n).map_err(|e| e.to_string()))
            .map(Value::Uint32)
            .map_err(fail),
        Kind::Uint64 => integral(value)
            .and_then(|n| u64::try_from(n).map_err(|e| e.to_string()))
            .map(Value::Uint64)
            .map_err(fail),
        Kind::Float => floating(value).map(|v| Value::Float(v as f32)).map_err(fail),
        Kind::Double => floating(value).map(Value::Double).map_err(fail),
        Kind::Str => match value {
            Value::Binary(bytes) => String::from_utf8(bytes.clone())
                .map(Value::Str)
                .map_err(|e| fail(e.to_string())),
            other => Ok(Value::Str(other.to_string())),
        },
        Kind::Binary => match value {
            Value::Str(raw) => Ok(Value::Binary(raw.as_bytes().to_vec())),
            Value::Binary(bytes) => Ok(Value::Binary(bytes.clone())),
            _ => Err(fail("only strings convert to binary".to_string())),
        },
        Kind::Date => match value {
            Value::Str(raw) => parse_date(raw).map(Value::Date).map_err(fail),
            Value::Timestamp(ts) => Ok(Value::Date(ts.date_naive())),
            Value::Date(date) => Ok(Value::Date(*date)),
            _ => Err(fail("expected a date string or timestamp".to_string())),
        },
        Kind::Timestamp => match value {
            Value::Str(raw) => parse_timestamp(raw).map(Value::Timestamp).map_err(fail),
            Value::Date(date) => {
                let midnight = NaiveDateTime::new(*date, NaiveTime::MIN);
                Ok(Value::Timestamp(DateTime::<Utc>::from_naive_utc_and_offset(midnight, Utc)))
            }
            Value::Timestamp(ts) => Ok(Value::Timestamp(*ts)),
            _ => Err(fail("expected a timestamp string or date".to_string())),
        },
    }
}

fn integral(value: &Value) -> Result<i128, String> {
    match value {
        Value::Bool(v) => Ok(i128::from(*v)),
        Value::Int32(v) => Ok(i128::from(*v)),
        Value::Int64(v) => Ok(i128::from(*v)),
        Value::Uint32(v) => Ok(i128::from(*v)),
        Value::Uint64(v) => Ok(i128::from(*v)),
        Value::Float(v) => round(f64::from(*v)),
        Value::Double(v) => round(*v),
        Value::Str(raw) => {
            raw.trim().parse::<i128>().map_err(|_e| format!("{raw:?} is not an integer"))
        }
        other => Err(format!("{} is not numeric", other.type_name())),
    }
}

fn round(value: f64) -> Result<i128, String> {
    if !value.is_finite() {
        return Err(format!("{value} is not finite"));
    }
    let rounded = value.round_ties_even();
    if rounded.abs() > 1e38 {
        return Err(format!("{value} is out of range"));
    }
    Ok(rounded as i128)
}

fn floating(value: &Value) -> Result<f64, String> {
    match value {
        Value::Bool(v) => Ok(if *v { 1.0 } else { 0.0 }),
        Value::Int32(v) => Ok(f64::from(*v)),
        Value::Int64(v) => Ok(*v as f64),
        Value::Uint32(v) => Ok(f64::from(*v)),
        Value::Uint64(v) => Ok(*v as f64),
        Value::Float(v) => Ok(f64::from(*v)),
        Value::Double(v) => Ok(*v),
        Value::Str(raw) => {
            raw.trim().parse::<f64>().map_err(|_e| format!("{raw:?} is not a number"))
        }
        other => Err(format!("{} is not numeric", other.type_name())),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_e| format!("unsupported date: {raw}; expected \"%Y-%m-%d\" format"))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(DateTime::<Utc>::from_naive_utc_and_offset(parsed, Utc));
    }

    Err(format!(
        "unsupported timestamp: {raw}; expected RFC3339 or \"%Y-%m-%d %H:%M:%S%.f\" format"
    ))
}
