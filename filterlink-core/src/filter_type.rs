//! Embedded filter types
//!
//! The type of a filter is always stated explicitly by whoever hands us a
//! buffer or an advertisement; it is never guessed from buffer content.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{decimation, temporal};
use crate::errors::FilterError;

/// Device-side signal-processing stages this crate can control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// Resolution reduction by a fixed magnitude
    Decimation,
    /// Temporal smoothing across frames
    Temporal,
}

impl FilterType {
    /// All known filter types, in discovery order
    pub const ALL: [FilterType; 2] = [FilterType::Decimation, FilterType::Temporal];

    /// Wire name of the type
    pub const fn name(&self) -> &'static str {
        match self {
            FilterType::Decimation => "decimation",
            FilterType::Temporal => "temporal",
        }
    }

    /// Exact parameter buffer length for this type
    pub const fn buffer_len(&self) -> usize {
        match self {
            FilterType::Decimation => decimation::BUFFER_LEN,
            FilterType::Temporal => temporal::BUFFER_LEN,
        }
    }

    /// Option names a complete options update must carry, in wire order
    pub const fn option_names(&self) -> &'static [&'static str] {
        match self {
            FilterType::Decimation => decimation::OPTION_NAMES,
            FilterType::Temporal => temporal::OPTION_NAMES,
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterType {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "decimation" => Ok(FilterType::Decimation),
            "temporal" => Ok(FilterType::Temporal),
            other => Err(FilterError::UnknownFilterType(other.to_string())),
        }
    }
}
