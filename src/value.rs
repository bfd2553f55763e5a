//! The closed wire value model.
//!
//! A [`Value`] is what the scalar codec reads and writes: scalar leaves, the
//! two container shapes, and the `Reference` pointer used between slots.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Smallest integer the wire format can carry.
pub const INTEGER_MIN: i128 = i64::MIN as i128;
/// Largest integer the wire format can carry.
pub const INTEGER_MAX: i128 = u64::MAX as i128;

/// A floating point number together with its precision tag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Float {
    /// Single precision.
    F32(f32),
    /// Double precision.
    F64(f64),
}

impl Float {
    /// Widens the value to `f64`.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::F32(v) => f64::from(v),
            Self::F64(v) => v,
        }
    }
}

/// One decoded wire value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absence of a value.
    Nil,
    /// A boolean.
    Boolean(bool),
    /// A signed integer in `INTEGER_MIN..=INTEGER_MAX`.
    Integer(i128),
    /// A float with its precision tag.
    Float(Float),
    /// A UTF-8 string.
    String(String),
    /// Raw bytes.
    Bytes(Bytes),
    /// An ordered list of values.
    Sequence(Vec<Value>),
    /// Key/value pairs in insertion order. Keys need not be strings.
    Mapping(Vec<(Value, Value)>),
    /// Pointer to another slot by its zero-based position in the stream.
    Reference(u64),
}

/// The kind of a [`Value`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    /// `Value::Nil`
    Nil,
    /// `Value::Boolean`
    Boolean,
    /// `Value::Integer`
    Integer,
    /// `Value::Float`
    Float,
    /// `Value::String`
    String,
    /// `Value::Bytes`
    Bytes,
    /// `Value::Sequence`
    Sequence,
    /// `Value::Mapping`
    Mapping,
    /// `Value::Reference`
    Reference,
}

impl Value {
    /// Returns the kind tag of this value.
    pub fn kind(&self) -> Kind {
        match self {
            Self::Nil => Kind::Nil,
            Self::Boolean(_) => Kind::Boolean,
            Self::Integer(_) => Kind::Integer,
            Self::Float(_) => Kind::Float,
            Self::String(_) => Kind::String,
            Self::Bytes(_) => Kind::Bytes,
            Self::Sequence(_) => Kind::Sequence,
            Self::Mapping(_) => Kind::Mapping,
            Self::Reference(_) => Kind::Reference,
        }
    }

    /// Returns true for the leaf kinds (everything but containers and references).
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            Self::Sequence(_) | Self::Mapping(_) | Self::Reference(_)
        )
    }

    /// Returns the string payload, if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Number of direct children (elements or pairs) of a container.
    pub fn child_count(&self) -> usize {
        match self {
            Self::Sequence(items) => items.len(),
            Self::Mapping(pairs) => pairs.len(),
            _ => 0,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nil => "nil",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Sequence => "sequence",
            Self::Mapping => "mapping",
            Self::Reference => "reference",
        };
        f.write_str(name)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(i128::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Integer(i128::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(Float::F64(v))
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(Float::F32(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Self::Bytes(v)
    }
}
