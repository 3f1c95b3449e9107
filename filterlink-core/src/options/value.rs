//! Option values and their structured (named-field) form

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{FilterError, FilterResult};

/// Value kind an option declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    /// Whole numbers (flags, counts, indices)
    Int,
    /// Floating point
    Float,
}

impl OptionKind {
    /// Human-readable kind, used in type-mismatch errors
    pub const fn describe(&self) -> &'static str {
        match self {
            OptionKind::Int => "integer",
            OptionKind::Float => "float",
        }
    }
}

/// A scalar option value as carried in structured messages
///
/// Serialized untagged, so `1` reads as `Int(1)` and `0.4` as `Float(0.4)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Integral value
    Int(i64),
    /// Fractional value
    Float(f64),
}

impl OptionValue {
    /// Numeric value as f64, whatever the representation
    pub fn as_f64(&self) -> f64 {
        match *self {
            OptionValue::Int(v) => v as f64,
            OptionValue::Float(v) => v,
        }
    }

    /// Integral value, rejecting fractional floats
    pub fn as_i64(&self, field: &str) -> FilterResult<i64> {
        match *self {
            OptionValue::Int(v) => Ok(v),
            OptionValue::Float(v) if v.fract() == 0.0 && v.is_finite() => Ok(v as i64),
            OptionValue::Float(v) => Err(FilterError::TypeMismatch {
                field: field.to_string(),
                expected: OptionKind::Int.describe(),
                found: v.to_string(),
            }),
        }
    }

    /// Coerce into the representation a kind expects
    pub fn coerce(&self, kind: OptionKind, field: &str) -> FilterResult<OptionValue> {
        match kind {
            OptionKind::Int => self.as_i64(field).map(OptionValue::Int),
            OptionKind::Float => Ok(OptionValue::Float(self.as_f64())),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Int(v) => write!(f, "{}", v),
            OptionValue::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Int(v)
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        OptionValue::Int(v as i64)
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Int(v as i64)
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        OptionValue::Float(v)
    }
}

impl From<f32> for OptionValue {
    fn from(v: f32) -> Self {
        OptionValue::Float(v as f64)
    }
}

/// One `{name, value}` pair of a structured options update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValue {
    /// Exact, case-sensitive option name
    pub name: String,
    /// New value
    pub value: OptionValue,
}

impl NamedValue {
    /// Pair a name with a value
    pub fn new(name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Find a value by exact name in an options update
pub fn find_value<'a>(values: &'a [NamedValue], name: &str) -> Option<&'a OptionValue> {
    values.iter().find(|v| v.name == name).map(|v| &v.value)
}
