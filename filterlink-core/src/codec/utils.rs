//! Shared field checks and little-endian readers
//!
//! Every check names the field it guards so the caller gets an error that
//! says which option was wrong, which bound it broke and what was received.

use crate::errors::{Bound, FilterError, FilterResult};
use crate::filter_type::FilterType;
use crate::options::{NamedValue, OptionValue};

/// Reject buffers whose length differs from the layout
pub fn check_len(filter: FilterType, bytes: &[u8]) -> FilterResult<()> {
    let expected = filter.buffer_len();
    if bytes.len() != expected {
        return Err(FilterError::BufferSize {
            filter,
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// Flag byte must be exactly 0 or 1
pub fn check_flag(field: &str, value: i64) -> FilterResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(FilterError::out_of_range(field, other as f64, Bound::Flag)),
    }
}

/// Inclusive integer range check, done before any narrowing
pub fn check_range_i64(field: &str, value: i64, min: i64, max: i64) -> FilterResult<()> {
    if value < min {
        Err(FilterError::out_of_range(field, value as f64, Bound::Minimum(min as f64)))
    } else if value > max {
        Err(FilterError::out_of_range(field, value as f64, Bound::Maximum(max as f64)))
    } else {
        Ok(())
    }
}

/// Inclusive float range check; NaN is a type error, not a range error
pub fn check_range_f64(field: &str, value: f64, min: f64, max: f64) -> FilterResult<()> {
    if value.is_nan() {
        return Err(FilterError::TypeMismatch {
            field: field.to_string(),
            expected: "float",
            found: "NaN".to_string(),
        });
    }
    if value < min {
        Err(FilterError::out_of_range(field, value, Bound::Minimum(min)))
    } else if value > max {
        Err(FilterError::out_of_range(field, value, Bound::Maximum(max)))
    } else {
        Ok(())
    }
}

fn field4(filter: FilterType, bytes: &[u8], offset: usize) -> FilterResult<[u8; 4]> {
    let mut raw = [0u8; 4];
    let src = bytes
        .get(offset..offset + 4)
        .ok_or(FilterError::BufferSize {
            filter,
            expected: filter.buffer_len(),
            actual: bytes.len(),
        })?;
    raw.copy_from_slice(src);
    Ok(raw)
}

/// Read a 4-byte little-endian float at `offset`
pub fn read_f32_le(filter: FilterType, bytes: &[u8], offset: usize) -> FilterResult<f32> {
    field4(filter, bytes, offset).map(f32::from_le_bytes)
}

/// Read a 4-byte little-endian signed integer at `offset`
pub fn read_i32_le(filter: FilterType, bytes: &[u8], offset: usize) -> FilterResult<i32> {
    field4(filter, bytes, offset).map(i32::from_le_bytes)
}

/// Require that an options update is exactly the filter's complete set
///
/// Unknown names are reported first (protocol mismatch), then missing
/// names, then duplicates showing up as a count mismatch.
pub fn check_complete(filter: FilterType, values: &[NamedValue]) -> FilterResult<()> {
    let names = filter.option_names();
    if let Some(unknown) = values.iter().find(|v| !names.contains(&v.name.as_str())) {
        return Err(FilterError::UnknownOption {
            filter,
            name: unknown.name.clone(),
        });
    }
    if let Some(missing) = names
        .iter()
        .find(|name| !values.iter().any(|v| v.name == **name))
    {
        return Err(FilterError::MissingOption {
            filter,
            name: *missing,
        });
    }
    if values.len() != names.len() {
        return Err(FilterError::OptionCount {
            filter,
            expected: names.len(),
            actual: values.len(),
        });
    }
    Ok(())
}

/// Fetch a required value by name
pub fn require(
    filter: FilterType,
    values: &[NamedValue],
    name: &'static str,
) -> FilterResult<OptionValue> {
    crate::options::find_value(values, name)
        .copied()
        .ok_or(FilterError::MissingOption { filter, name })
}

/// Replace one named value inside a complete options set
pub fn overlay(
    filter: FilterType,
    values: &mut [NamedValue],
    name: &str,
    value: OptionValue,
) -> FilterResult<()> {
    match values.iter_mut().find(|v| v.name == name) {
        Some(slot) => {
            slot.value = value;
            Ok(())
        }
        None => Err(FilterError::UnknownOption {
            filter,
            name: name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_accepts_only_zero_and_one() {
        assert_eq!(check_flag("Toggle", 0), Ok(false));
        assert_eq!(check_flag("Toggle", 1), Ok(true));
        assert_eq!(
            check_flag("Toggle", 2),
            Err(FilterError::out_of_range("Toggle", 2.0, Bound::Flag))
        );
    }

    #[test]
    fn integer_range_is_inclusive() {
        assert!(check_range_i64("Delta", 0, 0, 100).is_ok());
        assert!(check_range_i64("Delta", 100, 0, 100).is_ok());
        assert!(check_range_i64("Delta", 101, 0, 100).is_err());
        assert!(check_range_i64("Delta", i64::MIN, 0, 100).is_err());
    }

    #[test]
    fn float_range_rejects_nan() {
        assert!(matches!(
            check_range_f64("Alpha", f64::NAN, 0.0, 1.0),
            Err(FilterError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn readers_refuse_to_run_past_the_end() {
        let bytes = [0u8; 13];
        assert!(read_i32_le(FilterType::Temporal, &bytes, 9).is_ok());
        assert!(read_i32_le(FilterType::Temporal, &bytes, 10).is_err());
        assert!(read_i32_le(FilterType::Temporal, &bytes, 13).is_err());
    }

    #[test]
    fn completeness_reports_unknown_before_missing() {
        let values = vec![NamedValue::new("Toggle", 1), NamedValue::new("Size", 2)];
        assert_eq!(
            check_complete(FilterType::Decimation, &values),
            Err(FilterError::UnknownOption {
                filter: FilterType::Decimation,
                name: "Size".into()
            })
        );
    }

    #[test]
    fn duplicates_fail_the_count() {
        let values = vec![
            NamedValue::new("Toggle", 1),
            NamedValue::new("Magnitude", 2),
            NamedValue::new("Toggle", 0),
        ];
        assert!(matches!(
            check_complete(FilterType::Decimation, &values),
            Err(FilterError::OptionCount { expected: 2, actual: 3, .. })
        ));
    }

    #[test]
    fn overlay_replaces_in_place() {
        let mut values = vec![NamedValue::new("Toggle", 0), NamedValue::new("Magnitude", 2)];
        overlay(FilterType::Decimation, &mut values, "Toggle", OptionValue::Int(1)).unwrap();
        assert_eq!(values[0], NamedValue::new("Toggle", 1));
        assert!(overlay(FilterType::Decimation, &mut values, "Alpha", OptionValue::Int(1)).is_err());
    }
}
