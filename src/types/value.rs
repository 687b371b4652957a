//! Value - a single column value outside the packed layout.
//!
//! Values are what callers hand to aggregators and what materialized rows
//! hold. Inside a [`crate::FlatBuffer`] nothing is stored as a `Value`; the
//! packed bytes are decoded on demand.
//!
//! # Example
//!
//! ```rust,ignore
//! use photonflat::Value;
//!
//! let key = Value::BigInt(7);
//! let name = Value::from("north");
//! let tags = Value::Array(vec![Value::from("a"), Value::Null]);
//! ```

use super::kind::Kind;
use serde::Serialize;

/// A typed value, or null
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    TinyInt(i8),
    SmallInt(i16),
    Integer(i32),
    BigInt(i64),
    Int128(i128),
    Real(f32),
    Double(f64),
    Varchar(String),
    /// VARCHAR payload that is not valid UTF-8
    Bytes(Vec<u8>),
    Array(Vec<Value>),
}

impl Value {
    /// VARCHAR value from raw bytes; non-UTF-8 payloads are kept verbatim
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(s) => Value::Varchar(s.to_string()),
            Err(_) => Value::Bytes(bytes.to_vec()),
        }
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Kind of a non-null value
    pub fn kind(&self) -> Option<Kind> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(Kind::Boolean),
            Value::TinyInt(_) => Some(Kind::TinyInt),
            Value::SmallInt(_) => Some(Kind::SmallInt),
            Value::Integer(_) => Some(Kind::Integer),
            Value::BigInt(_) => Some(Kind::BigInt),
            Value::Int128(_) => Some(Kind::Int128),
            Value::Real(_) => Some(Kind::Real),
            Value::Double(_) => Some(Kind::Double),
            Value::Varchar(_) | Value::Bytes(_) => Some(Kind::Varchar),
            Value::Array(_) => Some(Kind::Array),
        }
    }

    /// Get as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get any integral value widened to i64 (INT128 only if it fits)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::TinyInt(v) => Some(*v as i64),
            Value::SmallInt(v) => Some(*v as i64),
            Value::Integer(v) => Some(*v as i64),
            Value::BigInt(v) => Some(*v),
            Value::Int128(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Get any integral value widened to i128
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int128(v) => Some(*v),
            other => other.as_i64().map(i128::from),
        }
    }

    /// Get any numeric value as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            Value::Int128(v) => Some(*v as f64),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Varchar(s) => Some(s),
            _ => None,
        }
    }

    /// Raw bytes of a VARCHAR value
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Varchar(s) => Some(s.as_bytes()),
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get as array
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

// Conversions
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i8> for Value {
    fn from(n: i8) -> Self {
        Value::TinyInt(n)
    }
}

impl From<i16> for Value {
    fn from(n: i16) -> Self {
        Value::SmallInt(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::BigInt(n)
    }
}

impl From<i128> for Value {
    fn from(n: i128) -> Self {
        Value::Int128(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Real(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Varchar(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Varchar(s.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}
