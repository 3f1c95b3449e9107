//! Option declarations
//!
//! When a device advertises a filter it declares each option in full:
//! `{name, type, minimum, maximum, step, default, value}`. Updates afterwards
//! only carry `{name, value}` pairs.

use serde::{Deserialize, Serialize};

use super::value::{NamedValue, OptionKind, OptionValue};
use crate::errors::{Bound, FilterError, FilterResult};

/// Numeric range of an option
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionRange {
    /// Smallest accepted value
    pub min: f64,
    /// Largest accepted value
    pub max: f64,
    /// Increment between settings
    pub step: f64,
    /// Value the device starts with
    pub default: f64,
}

impl OptionRange {
    /// Is `value` inside `[min, max]`? NaN never is.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// One option as declared by the device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDescriptor {
    /// Exact, case-sensitive name
    pub name: String,
    /// Value kind
    #[serde(rename = "type")]
    pub kind: OptionKind,
    /// Lower bound, if the device states one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<OptionValue>,
    /// Upper bound, if the device states one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<OptionValue>,
    /// Step between settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<OptionValue>,
    /// Device default
    pub default: OptionValue,
    /// Value at advertisement time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<OptionValue>,
    /// Free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OptionDescriptor {
    /// Declare an integer option
    pub fn int(name: &str, min: i64, max: i64, step: i64, default: i64) -> Self {
        Self {
            name: name.to_string(),
            kind: OptionKind::Int,
            minimum: Some(OptionValue::Int(min)),
            maximum: Some(OptionValue::Int(max)),
            step: Some(OptionValue::Int(step)),
            default: OptionValue::Int(default),
            value: Some(OptionValue::Int(default)),
            description: None,
        }
    }

    /// Declare a float option
    pub fn float(name: &str, min: f64, max: f64, step: f64, default: f64) -> Self {
        Self {
            name: name.to_string(),
            kind: OptionKind::Float,
            minimum: Some(OptionValue::Float(min)),
            maximum: Some(OptionValue::Float(max)),
            step: Some(OptionValue::Float(step)),
            default: OptionValue::Float(default),
            value: Some(OptionValue::Float(default)),
            description: None,
        }
    }

    /// Attach a description
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Range with unbounded sides widened to the extremes
    pub fn range(&self) -> OptionRange {
        OptionRange {
            min: self.minimum.map(|v| v.as_f64()).unwrap_or(f64::MIN),
            max: self.maximum.map(|v| v.as_f64()).unwrap_or(f64::MAX),
            step: self.step.map(|v| v.as_f64()).unwrap_or(1.0),
            default: self.default.as_f64(),
        }
    }

    /// Value at advertisement, falling back to the default
    pub fn initial_value(&self) -> OptionValue {
        self.value.unwrap_or(self.default)
    }

    /// Check a value against the declared kind and bounds
    ///
    /// Returns the value coerced to the declared kind.
    pub fn check(&self, value: OptionValue) -> FilterResult<OptionValue> {
        let value = value.coerce(self.kind, &self.name)?;
        let v = value.as_f64();
        if v.is_nan() {
            return Err(FilterError::TypeMismatch {
                field: self.name.clone(),
                expected: self.kind.describe(),
                found: "NaN".to_string(),
            });
        }
        if let Some(min) = self.minimum {
            if v < min.as_f64() {
                return Err(FilterError::out_of_range(&self.name, v, Bound::Minimum(min.as_f64())));
            }
        }
        if let Some(max) = self.maximum {
            if v > max.as_f64() {
                return Err(FilterError::out_of_range(&self.name, v, Bound::Maximum(max.as_f64())));
            }
        }
        Ok(value)
    }

    /// The `{name, value}` form of this option's current value
    pub fn named_value(&self) -> NamedValue {
        NamedValue {
            name: self.name.clone(),
            value: self.initial_value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_enforces_declared_bounds() {
        let delta = OptionDescriptor::int("Delta", 0, 100, 1, 20);
        assert_eq!(delta.check(OptionValue::Int(100)).unwrap(), OptionValue::Int(100));
        let err = delta.check(OptionValue::Int(101)).unwrap_err();
        assert_eq!(err, FilterError::out_of_range("Delta", 101.0, Bound::Maximum(100.0)));
        let err = delta.check(OptionValue::Int(-1)).unwrap_err();
        assert_eq!(err, FilterError::out_of_range("Delta", -1.0, Bound::Minimum(0.0)));
    }

    #[test]
    fn check_rejects_nan() {
        let alpha = OptionDescriptor::float("Alpha", 0.0, 1.0, 0.1, 0.4);
        assert!(alpha.check(OptionValue::Float(f64::NAN)).is_err());
    }

    #[test]
    fn missing_bounds_mean_unbounded() {
        let mut opt = OptionDescriptor::int("Free", 0, 0, 1, 0);
        opt.minimum = None;
        opt.maximum = None;
        assert!(opt.check(OptionValue::Int(i64::MAX)).is_ok());
        assert!(opt.range().contains(1e300));
    }
}
