//! Core of FilterLink
//!
//! Control-plane pieces for embedded signal-processing filters running on a
//! remote sensing device. Nothing here knows about the transport:
//!
//! - wire codecs between the binary parameter layout and named options
//! - option models, option-id interning and change subscriptions
//! - the filter contract, an offline filter and a capability registry
//! - settings persistence helpers
//!
//! ```rust
//! use filterlink_core::{codec, FilterType, EmbeddedFilter};
//! use filterlink_core::local::LocalDecimationFilter;
//!
//! let filter = LocalDecimationFilter::new("Decimation Filter");
//! filter.enable(true).unwrap();
//! assert_eq!(filter.get().unwrap().as_slice(), &[1, 2]);
//!
//! let params = codec::decode(FilterType::Decimation, &[1, 2]).unwrap();
//! assert!(params.is_enabled());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod macros;

pub mod buffer;
pub mod capability;
pub mod codec;
pub mod constants;
pub mod errors;
pub mod filter;
pub mod filter_type;
pub mod local;
pub mod options;
pub mod persistence;
pub mod sensor;

// Public API
pub use buffer::ParameterBuffer;
pub use capability::{Capability, CapabilityRegistry};
pub use codec::{FilterParams, ParameterCodec};
pub use errors::{Bound, FilterError, FilterResult};
pub use filter::{DecimationControl, EmbeddedFilter, FilterState, TemporalControl};
pub use filter_type::FilterType;
pub use options::{OptionId, OptionModel, OptionValue, OptionsWatcher};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
