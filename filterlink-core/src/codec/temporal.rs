//! Temporal smoothing codec
//!
//! Thirteen bytes: enabled flag, then alpha (f32), delta (i32) and
//! persistency (i32), each four bytes little-endian. All four options must
//! travel together; a partial options update is rejected.

use super::utils::{
    check_complete, check_flag, check_len, check_range_f64, check_range_i64, read_f32_le,
    read_i32_le, require,
};
use super::{capacity_error, ParameterCodec};
use crate::buffer::ParameterBuffer;
use crate::constants::temporal::*;
use crate::constants::{ALPHA, DELTA, PERSISTENCY, TOGGLE};
use crate::errors::FilterResult;
use crate::filter_type::FilterType;
use crate::options::{NamedValue, OptionDescriptor, OptionValue};

/// Temporal filter codec marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Temporal;

/// Temporal smoothing parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemporalParams {
    /// Filter on/off
    pub enabled: bool,
    /// Smoothing factor, `[0.0, 1.0]`
    pub alpha: f32,
    /// Edge-preserving threshold, `[0, 100]`
    pub delta: i32,
    /// Persistency index, `[0, 8]`
    pub persistency: i32,
}

impl Default for TemporalParams {
    fn default() -> Self {
        Temporal::defaults()
    }
}

fn check_alpha(value: f64) -> FilterResult<f32> {
    check_range_f64(ALPHA, value, ALPHA_MIN as f64, ALPHA_MAX as f64)?;
    Ok(value as f32)
}

fn check_delta(value: i64) -> FilterResult<i32> {
    check_range_i64(DELTA, value, DELTA_MIN as i64, DELTA_MAX as i64)?;
    Ok(value as i32)
}

fn check_persistency(value: i64) -> FilterResult<i32> {
    check_range_i64(PERSISTENCY, value, PERSISTENCY_MIN as i64, PERSISTENCY_MAX as i64)?;
    Ok(value as i32)
}

impl ParameterCodec for Temporal {
    const FILTER_TYPE: FilterType = FilterType::Temporal;

    type Params = TemporalParams;

    fn defaults() -> TemporalParams {
        TemporalParams {
            enabled: false,
            alpha: ALPHA_DEFAULT,
            delta: DELTA_DEFAULT,
            persistency: PERSISTENCY_DEFAULT,
        }
    }

    fn validate(params: &TemporalParams) -> FilterResult<()> {
        check_alpha(params.alpha as f64)?;
        check_delta(params.delta as i64)?;
        check_persistency(params.persistency as i64)?;
        Ok(())
    }

    fn write_fields(params: &TemporalParams, out: &mut ParameterBuffer) -> FilterResult<()> {
        out.push(params.enabled as u8)
            .and_then(|_| out.extend_from_slice(&params.alpha.to_le_bytes()))
            .and_then(|_| out.extend_from_slice(&params.delta.to_le_bytes()))
            .and_then(|_| out.extend_from_slice(&params.persistency.to_le_bytes()))
            .map_err(|e| capacity_error(Self::FILTER_TYPE, e.len))
    }

    fn read_fields(bytes: &[u8]) -> FilterResult<TemporalParams> {
        check_len(Self::FILTER_TYPE, bytes)?;
        Ok(TemporalParams {
            enabled: check_flag(TOGGLE, bytes[ENABLED_OFFSET] as i64)?,
            alpha: read_f32_le(Self::FILTER_TYPE, bytes, ALPHA_OFFSET)?,
            delta: read_i32_le(Self::FILTER_TYPE, bytes, DELTA_OFFSET)?,
            persistency: read_i32_le(Self::FILTER_TYPE, bytes, PERSISTENCY_OFFSET)?,
        })
    }

    fn to_options(params: &TemporalParams) -> Vec<NamedValue> {
        vec![
            NamedValue::new(TOGGLE, params.enabled),
            NamedValue::new(ALPHA, params.alpha),
            NamedValue::new(DELTA, params.delta),
            NamedValue::new(PERSISTENCY, params.persistency),
        ]
    }

    fn from_options(values: &[NamedValue]) -> FilterResult<TemporalParams> {
        check_complete(Self::FILTER_TYPE, values)?;
        let ty = Self::FILTER_TYPE;
        let toggle = require(ty, values, TOGGLE)?.as_i64(TOGGLE)?;
        let alpha = require(ty, values, ALPHA)?.as_f64();
        let delta = require(ty, values, DELTA)?.as_i64(DELTA)?;
        let persistency = require(ty, values, PERSISTENCY)?.as_i64(PERSISTENCY)?;
        Ok(TemporalParams {
            enabled: check_flag(TOGGLE, toggle)?,
            alpha: check_alpha(alpha)?,
            delta: check_delta(delta)?,
            persistency: check_persistency(persistency)?,
        })
    }

    fn declarations() -> Vec<OptionDescriptor> {
        vec![
            OptionDescriptor::int(TOGGLE, 0, 1, 1, 0)
                .with_description("Enable temporal smoothing on the device"),
            OptionDescriptor::float(
                ALPHA,
                ALPHA_MIN as f64,
                ALPHA_MAX as f64,
                ALPHA_STEP as f64,
                ALPHA_DEFAULT as f64,
            )
            .with_description("Weight of the current frame against history"),
            OptionDescriptor::int(
                DELTA,
                DELTA_MIN as i64,
                DELTA_MAX as i64,
                1,
                DELTA_DEFAULT as i64,
            )
            .with_description("Step size boundary preserving edges"),
            OptionDescriptor::int(
                PERSISTENCY,
                PERSISTENCY_MIN as i64,
                PERSISTENCY_MAX as i64,
                1,
                PERSISTENCY_DEFAULT as i64,
            )
            .with_description("Persistency index for filling missing pixels"),
        ]
    }

    fn enabled(params: &TemporalParams) -> bool {
        params.enabled
    }

    fn with_enabled(params: &TemporalParams, enabled: bool) -> TemporalParams {
        TemporalParams { enabled, ..*params }
    }
}

impl TemporalParams {
    /// Alpha as the structured value carried on the wire
    pub fn alpha_value(&self) -> OptionValue {
        OptionValue::from(self.alpha)
    }
}
