//! Decimation codec
//!
//! Two bytes: the enabled flag and a one-byte magnitude fixed at 2.
//! Magnitude is checked on the full integer before it is narrowed to a byte,
//! so 258 is rejected rather than wrapping to 2.

use super::utils::{check_complete, check_flag, check_len, require};
use super::{capacity_error, ParameterCodec};
use crate::buffer::ParameterBuffer;
use crate::constants::decimation::{
    ENABLED_OFFSET, MAGNITUDE as REQUIRED_MAGNITUDE, MAGNITUDE_OFFSET,
};
use crate::constants::{MAGNITUDE, TOGGLE};
use crate::errors::{Bound, FilterError, FilterResult};
use crate::filter_type::FilterType;
use crate::options::{NamedValue, OptionDescriptor};

/// Decimation filter codec marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Decimation;

/// Decimation filter parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimationParams {
    /// Filter on/off
    pub enabled: bool,
    /// Decimation factor; the hardware only accepts 2
    pub magnitude: u8,
}

impl Default for DecimationParams {
    fn default() -> Self {
        Decimation::defaults()
    }
}

fn check_magnitude(value: i64) -> FilterResult<u8> {
    if value != REQUIRED_MAGNITUDE {
        return Err(FilterError::out_of_range(
            MAGNITUDE,
            value as f64,
            Bound::Exactly(REQUIRED_MAGNITUDE as f64),
        ));
    }
    Ok(value as u8)
}

impl ParameterCodec for Decimation {
    const FILTER_TYPE: FilterType = FilterType::Decimation;

    type Params = DecimationParams;

    fn defaults() -> DecimationParams {
        DecimationParams {
            enabled: false,
            magnitude: REQUIRED_MAGNITUDE as u8,
        }
    }

    fn validate(params: &DecimationParams) -> FilterResult<()> {
        check_magnitude(params.magnitude as i64).map(|_| ())
    }

    fn write_fields(params: &DecimationParams, out: &mut ParameterBuffer) -> FilterResult<()> {
        out.push(params.enabled as u8)
            .and_then(|_| out.push(params.magnitude))
            .map_err(|e| capacity_error(Self::FILTER_TYPE, e.len))
    }

    fn read_fields(bytes: &[u8]) -> FilterResult<DecimationParams> {
        check_len(Self::FILTER_TYPE, bytes)?;
        Ok(DecimationParams {
            enabled: check_flag(TOGGLE, bytes[ENABLED_OFFSET] as i64)?,
            magnitude: bytes[MAGNITUDE_OFFSET],
        })
    }

    fn to_options(params: &DecimationParams) -> Vec<NamedValue> {
        vec![
            NamedValue::new(TOGGLE, params.enabled),
            NamedValue::new(MAGNITUDE, params.magnitude as i64),
        ]
    }

    fn from_options(values: &[NamedValue]) -> FilterResult<DecimationParams> {
        check_complete(Self::FILTER_TYPE, values)?;
        let toggle = require(Self::FILTER_TYPE, values, TOGGLE)?.as_i64(TOGGLE)?;
        let magnitude = require(Self::FILTER_TYPE, values, MAGNITUDE)?.as_i64(MAGNITUDE)?;
        Ok(DecimationParams {
            enabled: check_flag(TOGGLE, toggle)?,
            magnitude: check_magnitude(magnitude)?,
        })
    }

    fn declarations() -> Vec<OptionDescriptor> {
        vec![
            OptionDescriptor::int(TOGGLE, 0, 1, 1, 0)
                .with_description("Enable decimation on the device"),
            OptionDescriptor::int(MAGNITUDE, REQUIRED_MAGNITUDE, REQUIRED_MAGNITUDE, 1, REQUIRED_MAGNITUDE)
                .with_description("Decimation factor, fixed by hardware"),
        ]
    }

    fn enabled(params: &DecimationParams) -> bool {
        params.enabled
    }

    fn with_enabled(params: &DecimationParams, enabled: bool) -> DecimationParams {
        DecimationParams { enabled, ..*params }
    }
}
