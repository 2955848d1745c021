//! Dynamic column values.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The declared type of a column or parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// True/false.
    Boolean,
    /// Signed 64-bit integer.
    Integer,
    /// 64-bit floating point.
    Real,
    /// Exact decimal number.
    Decimal,
    /// UTF-8 text.
    Text,
    /// Raw bytes.
    Bytes,
}

impl DataType {
    /// Returns the lowercase name used in snapshot files and messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            DataType::Boolean => "boolean",
            DataType::Integer => "integer",
            DataType::Real => "real",
            DataType::Decimal => "decimal",
            DataType::Text => "text",
            DataType::Bytes => "bytes",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a value cannot be converted to a column type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {found} value {value} to {target}")]
pub struct ValueError {
    /// Type of the value that was offered.
    pub found: DataType,
    /// Type that was requested.
    pub target: DataType,
    /// Rendering of the offending value.
    pub value: String,
}

/// A dynamic value held by a snapshot row or bound to a parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// SQL NULL.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Real(f64),
    /// Exact decimal.
    Decimal(Decimal),
    /// Text string.
    Text(String),
    /// Byte string.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns the type of this value, or `None` for NULL.
    #[must_use]
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(DataType::Boolean),
            Value::Integer(_) => Some(DataType::Integer),
            Value::Real(_) => Some(DataType::Real),
            Value::Decimal(_) => Some(DataType::Decimal),
            Value::Text(_) => Some(DataType::Text),
            Value::Bytes(_) => Some(DataType::Bytes),
        }
    }

    /// Returns true if this is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts this value to `target`.
    ///
    /// Stores often hand back a narrower or wider representation than the
    /// column declares (SQLite returns decimals as text or reals, booleans
    /// as integers). Lossless conversions succeed; anything else is an
    /// error rather than a default.
    pub fn coerce(&self, target: DataType) -> Result<Value, ValueError> {
        let Some(found) = self.data_type() else {
            return Ok(Value::Null);
        };
        if found == target {
            return Ok(self.clone());
        }

        let converted = match (self, target) {
            (Value::Integer(i), DataType::Real) => Some(Value::Real(*i as f64)),
            (Value::Integer(i), DataType::Decimal) => Some(Value::Decimal(Decimal::from(*i))),
            (Value::Integer(0), DataType::Boolean) => Some(Value::Bool(false)),
            (Value::Integer(1), DataType::Boolean) => Some(Value::Bool(true)),
            (Value::Integer(i), DataType::Text) => Some(Value::Text(i.to_string())),
            (Value::Bool(b), DataType::Integer) => Some(Value::Integer(i64::from(*b))),
            (Value::Real(r), DataType::Decimal) => Decimal::from_f64(*r).map(Value::Decimal),
            (Value::Real(r), DataType::Integer) if r.fract() == 0.0 => {
                r.to_i64().map(Value::Integer)
            }
            (Value::Decimal(d), DataType::Real) => d.to_f64().map(Value::Real),
            (Value::Decimal(d), DataType::Integer) if d.fract().is_zero() => {
                d.to_i64().map(Value::Integer)
            }
            (Value::Decimal(d), DataType::Text) => Some(Value::Text(d.to_string())),
            (Value::Text(s), DataType::Decimal) => {
                Decimal::from_str(s.trim()).ok().map(Value::Decimal)
            }
            (Value::Text(s), DataType::Integer) => s.trim().parse().ok().map(Value::Integer),
            (Value::Text(s), DataType::Real) => s.trim().parse().ok().map(Value::Real),
            (Value::Text(s), DataType::Boolean) => match s.trim() {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            (Value::Text(s), DataType::Bytes) => Some(Value::Bytes(s.as_bytes().to_vec())),
            _ => None,
        };

        converted.ok_or_else(|| ValueError {
            found,
            target,
            value: self.to_string(),
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Text(s) => write!(f, "'{s}'"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Extraction of a typed Rust value from a [`Value`].
pub trait FromValue: Sized {
    /// The data type this extractor expects.
    const DATA_TYPE: DataType;

    /// Returns the typed value, or `None` if the value has another type.
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for bool {
    const DATA_TYPE: DataType = DataType::Boolean;

    fn from_value(value: &Value) -> Option<Self> {
        match value.coerce(Self::DATA_TYPE).ok()? {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl FromValue for i64 {
    const DATA_TYPE: DataType = DataType::Integer;

    fn from_value(value: &Value) -> Option<Self> {
        match value.coerce(Self::DATA_TYPE).ok()? {
            Value::Integer(i) => Some(i),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    const DATA_TYPE: DataType = DataType::Real;

    fn from_value(value: &Value) -> Option<Self> {
        match value.coerce(Self::DATA_TYPE).ok()? {
            Value::Real(r) => Some(r),
            _ => None,
        }
    }
}

impl FromValue for Decimal {
    const DATA_TYPE: DataType = DataType::Decimal;

    fn from_value(value: &Value) -> Option<Self> {
        match value.coerce(Self::DATA_TYPE).ok()? {
            Value::Decimal(d) => Some(d),
            _ => None,
        }
    }
}

impl FromValue for String {
    const DATA_TYPE: DataType = DataType::Text;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromValue for Vec<u8> {
    const DATA_TYPE: DataType = DataType::Bytes;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bytes(b) => Some(b.clone()),
            _ => None,
        }
    }
}
