//! Error Types for Embedded Filter Control
//!
//! ## Error Categories
//!
//! ### Wire Format Violations
//! - `BufferSize`: parameter buffer length differs from the filter's layout
//! - `OutOfRange`: a field is outside its declared bound (names field, bound and value)
//! - `TypeMismatch`: a structured value has the wrong shape for its field
//!
//! ### Protocol Mismatches
//! - `UnknownOption`: the remote side sent a name this filter never declared
//! - `MissingOption` / `OptionCount`: an options update is not the complete set
//!
//! ### Programming Errors
//! - `AlreadyInitialized`: structural filter fields declared twice
//! - `NotWired`: a filter was used before a transport was attached
//!
//! ### Collaborator Failures
//! - `Transport`: the device or transport rejected a validated update
//!
//! Every variant except `Transport` is raised locally, before anything is sent.
//!
//! ```rust
//! use filterlink_core::{codec, FilterError, FilterType};
//!
//! match codec::decode(FilterType::Decimation, &[1]) {
//!     Err(FilterError::BufferSize { expected, actual, .. }) => {
//!         assert_eq!((expected, actual), (2, 1));
//!     }
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

use core::fmt;

use thiserror_no_std::Error;

use crate::filter_type::FilterType;
use crate::options::OptionId;

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;

/// The bound a field value violated
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// Value was below this minimum
    Minimum(f64),
    /// Value was above this maximum
    Maximum(f64),
    /// Value must be exactly this (hardware constraint)
    Exactly(f64),
    /// Value must be one of the two flag states
    Flag,
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Minimum(min) => write!(f, "minimum {}", min),
            Bound::Maximum(max) => write!(f, "maximum {}", max),
            Bound::Exactly(required) => write!(f, "required value {}", required),
            Bound::Flag => write!(f, "flag values 0 (off) or 1 (on)"),
        }
    }
}

/// Errors raised by codecs, option models and filters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// Parameter buffer has the wrong length for its filter type
    #[error("{filter} parameter buffer must be {expected} bytes, received {actual}")]
    BufferSize {
        /// Filter whose layout was applied
        filter: FilterType,
        /// Layout length in bytes
        expected: usize,
        /// Length actually received
        actual: usize,
    },

    /// Field value outside its declared range
    #[error("{field} value {value} violates {bound}")]
    OutOfRange {
        /// Option name, e.g. "Alpha"
        field: String,
        /// The rejected value
        value: f64,
        /// The bound that was violated
        bound: Bound,
    },

    /// Structured value has the wrong type for its field
    #[error("{field} expects {expected} value, received {found}")]
    TypeMismatch {
        /// Option name
        field: String,
        /// Expected kind ("integer", "float")
        expected: &'static str,
        /// What was received, rendered for diagnostics
        found: String,
    },

    /// Options update names an option the filter never declared
    #[error("Unknown option '{name}' for {filter} filter")]
    UnknownOption {
        /// Filter receiving the update
        filter: FilterType,
        /// The unrecognized name
        name: String,
    },

    /// Options update lacks a required option
    #[error("{filter} filter update is missing option '{name}'")]
    MissingOption {
        /// Filter receiving the update
        filter: FilterType,
        /// The absent option name
        name: &'static str,
    },

    /// Options update does not carry the complete option set
    #[error("{filter} filter expects {expected} options, received {actual}")]
    OptionCount {
        /// Filter receiving the update
        filter: FilterType,
        /// Number of options in a complete update
        expected: usize,
        /// Number received
        actual: usize,
    },

    /// Structural field declared twice
    #[error("Cannot re-initialize {what} of filter '{filter}'")]
    AlreadyInitialized {
        /// Filter name (may be empty before naming)
        filter: String,
        /// Which structural field
        what: &'static str,
    },

    /// Filter used before its structural fields were declared
    #[error("Filter '{0}' is not populated")]
    NotPopulated(String),

    /// Option id not advertised by this filter
    #[error("Option {0} not found")]
    OptionNotFound(OptionId),

    /// Option currently disabled
    #[error("Option '{0}' is disabled")]
    OptionDisabled(String),

    /// Option cannot be written
    #[error("Option '{0}' is read-only")]
    ReadOnly(String),

    /// Operation addressed to the wrong filter type
    #[error("Filter type mismatch: expected {expected}, received {actual}")]
    WrongFilterType {
        /// The filter's own type
        expected: FilterType,
        /// Type named by the caller
        actual: FilterType,
    },

    /// Filter type string not recognized
    #[error("Unknown embedded filter type: {0}")]
    UnknownFilterType(String),

    /// Capability accessor registered twice for one object type
    #[error("Capability {capability} already registered for {object}")]
    DuplicateCapability {
        /// Object type name
        object: &'static str,
        /// Capability name
        capability: &'static str,
    },

    /// Filter type not offered by this sensor
    #[error("{0} filter is not supported by this sensor")]
    Unsupported(FilterType),

    /// No transmission callback wired yet
    #[error("Filter '{0}' has no transport wired")]
    NotWired(String),

    /// Transport or device rejected the update
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Filter is being torn down
    #[error("Filter '{0}' is being destroyed")]
    Destroyed(String),

    /// A lock holder panicked
    #[error("Lock poisoned")]
    LockPoisoned,
}

impl FilterError {
    /// Build an out-of-range error for a named field
    pub fn out_of_range(field: &str, value: f64, bound: Bound) -> Self {
        FilterError::OutOfRange {
            field: field.to_string(),
            value,
            bound,
        }
    }

    /// True for failures raised before anything reached the wire
    pub fn is_local(&self) -> bool {
        !matches!(self, FilterError::Transport(_))
    }
}

impl<T> From<std::sync::PoisonError<T>> for FilterError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        FilterError::LockPoisoned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_names_field_bound_and_value() {
        let err = FilterError::out_of_range("Alpha", 1.5, Bound::Maximum(1.0));
        let msg = err.to_string();
        assert!(msg.contains("Alpha"));
        assert!(msg.contains("maximum 1"));
        assert!(msg.contains("1.5"));
    }

    #[test]
    fn buffer_size_reports_expected_and_actual() {
        let err = FilterError::BufferSize {
            filter: FilterType::Temporal,
            expected: 13,
            actual: 9,
        };
        assert_eq!(
            err.to_string(),
            "temporal parameter buffer must be 13 bytes, received 9"
        );
    }

    #[test]
    fn only_transport_errors_are_remote() {
        assert!(FilterError::LockPoisoned.is_local());
        assert!(!FilterError::Transport("nack".into()).is_local());
    }
}
