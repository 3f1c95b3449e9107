//! Wire Codec - binary parameter buffers and structured options
//!
//! ## Overview
//!
//! Every filter type has two representations:
//!
//! - a fixed-layout **parameter buffer**, the legacy on-wire format
//! - a **structured options set**, `{name, value}` pairs exchanged over the
//!   publish/subscribe transport
//!
//! A [`ParameterCodec`] owns all layout knowledge for one filter type and
//! converts between the buffer, its typed parameters and the options set.
//!
//! ## Validation Is Never Skipped
//!
//! ```text
//! bytes ──check_len──> fields ──validate──> Params ──validate──> bytes
//!                                    ▲
//! options ──check_complete──> fields ┘
//! ```
//!
//! `decode` checks the length before touching any field, then runs the same
//! `validate` that `encode` runs on its input. A buffer rejected by one path
//! is rejected by every path, and `decode(encode(x)) == x` for every valid
//! `x`.
//!
//! ## Usage Example
//!
//! ```rust
//! use filterlink_core::codec::{Decimation, DecimationParams, ParameterCodec};
//!
//! let on = DecimationParams { enabled: true, magnitude: 2 };
//! let bytes = Decimation::encode(&on).unwrap();
//! assert_eq!(bytes.as_slice(), &[1, 2]);
//! assert_eq!(Decimation::decode(&bytes).unwrap(), on);
//!
//! // Magnitude is fixed by hardware.
//! assert!(Decimation::decode(&[1, 4]).is_err());
//! ```

use core::fmt::Debug;

use crate::buffer::ParameterBuffer;
use crate::errors::{FilterError, FilterResult};
use crate::filter_type::FilterType;
use crate::options::{NamedValue, OptionDescriptor};

mod decimation;
mod temporal;
pub mod utils;

pub use decimation::{Decimation, DecimationParams};
pub use temporal::{Temporal, TemporalParams};

/// Layout and validation rules of one filter type
pub trait ParameterCodec: 'static {
    /// The filter type this codec serves
    const FILTER_TYPE: FilterType;

    /// Typed parameters
    type Params: Copy + PartialEq + Debug + Send + Sync + 'static;

    /// Parameters the device starts with
    fn defaults() -> Self::Params;

    /// Check every field against its declared range
    fn validate(params: &Self::Params) -> FilterResult<()>;

    /// Layout bytes without validation; only called on validated params
    fn write_fields(params: &Self::Params, out: &mut ParameterBuffer) -> FilterResult<()>;

    /// Read fields from a buffer of the exact layout length
    fn read_fields(bytes: &[u8]) -> FilterResult<Self::Params>;

    /// Structured form, in wire order
    fn to_options(params: &Self::Params) -> Vec<NamedValue>;

    /// Parse and validate a complete options set
    fn from_options(values: &[NamedValue]) -> FilterResult<Self::Params>;

    /// Option declarations a device of this type advertises
    fn declarations() -> Vec<OptionDescriptor>;

    /// Enabled flag of a parameter set
    fn enabled(params: &Self::Params) -> bool;

    /// Copy of `params` with the enabled flag replaced
    fn with_enabled(params: &Self::Params, enabled: bool) -> Self::Params;

    /// Validate and encode into the binary layout
    fn encode(params: &Self::Params) -> FilterResult<ParameterBuffer> {
        Self::validate(params)?;
        let mut out = ParameterBuffer::new();
        Self::write_fields(params, &mut out)?;
        utils::check_len(Self::FILTER_TYPE, &out)?;
        Ok(out)
    }

    /// Length-check, decode and validate a binary buffer
    fn decode(bytes: &[u8]) -> FilterResult<Self::Params> {
        utils::check_len(Self::FILTER_TYPE, bytes)?;
        let params = Self::read_fields(bytes)?;
        Self::validate(&params)?;
        Ok(params)
    }
}

pub(crate) fn capacity_error(filter: FilterType, len: usize) -> FilterError {
    FilterError::BufferSize {
        filter,
        expected: filter.buffer_len(),
        actual: len,
    }
}

/// Typed parameters of either filter type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterParams {
    /// Decimation parameters
    Decimation(DecimationParams),
    /// Temporal smoothing parameters
    Temporal(TemporalParams),
}

impl FilterParams {
    /// Device defaults for a type
    pub fn defaults(filter: FilterType) -> Self {
        match filter {
            FilterType::Decimation => FilterParams::Decimation(Decimation::defaults()),
            FilterType::Temporal => FilterParams::Temporal(Temporal::defaults()),
        }
    }

    /// Filter type these parameters belong to
    pub fn filter_type(&self) -> FilterType {
        match self {
            FilterParams::Decimation(_) => FilterType::Decimation,
            FilterParams::Temporal(_) => FilterType::Temporal,
        }
    }

    /// Value of the enabled flag
    pub fn is_enabled(&self) -> bool {
        match self {
            FilterParams::Decimation(p) => Decimation::enabled(p),
            FilterParams::Temporal(p) => Temporal::enabled(p),
        }
    }

    /// Structured form, in wire order
    pub fn to_options(&self) -> Vec<NamedValue> {
        match self {
            FilterParams::Decimation(p) => Decimation::to_options(p),
            FilterParams::Temporal(p) => Temporal::to_options(p),
        }
    }

    /// Check every field against its declared range
    pub fn validate(&self) -> FilterResult<()> {
        match self {
            FilterParams::Decimation(p) => Decimation::validate(p),
            FilterParams::Temporal(p) => Temporal::validate(p),
        }
    }
}

impl From<DecimationParams> for FilterParams {
    fn from(params: DecimationParams) -> Self {
        FilterParams::Decimation(params)
    }
}

impl From<TemporalParams> for FilterParams {
    fn from(params: TemporalParams) -> Self {
        FilterParams::Temporal(params)
    }
}

/// Decode a buffer whose filter type the caller states
pub fn decode(filter: FilterType, bytes: &[u8]) -> FilterResult<FilterParams> {
    match filter {
        FilterType::Decimation => Decimation::decode(bytes).map(FilterParams::Decimation),
        FilterType::Temporal => Temporal::decode(bytes).map(FilterParams::Temporal),
    }
}

/// Validate and encode parameters of either type
pub fn encode(params: &FilterParams) -> FilterResult<ParameterBuffer> {
    match params {
        FilterParams::Decimation(p) => Decimation::encode(p),
        FilterParams::Temporal(p) => Temporal::encode(p),
    }
}

/// Validate a buffer without keeping the decoded parameters
pub fn validate(filter: FilterType, bytes: &[u8]) -> FilterResult<()> {
    decode(filter, bytes).map(|_| ())
}

/// Parse a complete options set of a stated type
pub fn from_options(filter: FilterType, values: &[NamedValue]) -> FilterResult<FilterParams> {
    match filter {
        FilterType::Decimation => Decimation::from_options(values).map(FilterParams::Decimation),
        FilterType::Temporal => Temporal::from_options(values).map(FilterParams::Temporal),
    }
}

/// Option declarations for a type
pub fn declarations(filter: FilterType) -> Vec<OptionDescriptor> {
    match filter {
        FilterType::Decimation => Decimation::declarations(),
        FilterType::Temporal => Temporal::declarations(),
    }
}
