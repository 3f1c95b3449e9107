//! Filter Interface
//!
//! ## Lifecycle
//!
//! ```text
//! Declared ──populate (once)──> Populated ──begin_destruction──> Destroyed
//! ```
//!
//! - **Declared**: options known from the device advertisement, no models yet
//! - **Populated**: every option wrapped in an [`OptionModel`], cache warm
//! - **Destroyed**: watchers retracted, no further dispatch
//!
//! Populating twice is a programming error and fails with
//! [`FilterError::AlreadyInitialized`](crate::FilterError::AlreadyInitialized).
//!
//! Two implementations exist: the remote-delegating filter (authoritative)
//! and the offline [`LocalFilter`](crate::local::LocalFilter). Which one a
//! sensor hands out is decided when the sensor is built.

use core::any::Any;
use std::collections::BTreeSet;

use crate::buffer::ParameterBuffer;
use crate::errors::FilterResult;
use crate::filter_type::FilterType;
use crate::options::{OptionId, OptionModel};

/// Lifecycle state of a filter instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    /// Options declared, not yet wrapped
    Declared,
    /// Option models live
    Populated,
    /// Torn down
    Destroyed,
}

/// Contract shared by every embedded filter
pub trait EmbeddedFilter: Send + Sync {
    /// Device-given name, e.g. "Decimation Filter"
    fn name(&self) -> &str;

    /// Filter type; never fails
    fn filter_type(&self) -> FilterType;

    /// Lifecycle state
    fn state(&self) -> FilterState;

    /// Last known enable flag, without a round trip
    fn is_enabled(&self) -> bool;

    /// Set the enable flag through the standard option-set path
    fn enable(&self, enabled: bool) -> FilterResult<()>;

    /// Ids of the options the device advertised
    fn supported_options(&self) -> BTreeSet<OptionId>;

    /// Option model for an advertised id
    fn option(&self, id: OptionId) -> FilterResult<&OptionModel>;

    /// Current parameters in the binary layout
    fn get(&self) -> FilterResult<ParameterBuffer>;

    /// Decode a binary layout and apply it as one complete update
    fn set(&self, bytes: &[u8]) -> FilterResult<()>;

    /// For capability queries
    fn as_any(&self) -> &(dyn Any + 'static);
}

/// Decimation-specific accessors
pub trait DecimationControl: EmbeddedFilter {
    /// Decimation factor; always 2 on current hardware
    fn magnitude(&self) -> FilterResult<u8>;
}

/// Temporal-specific accessors and typed setters
pub trait TemporalControl: EmbeddedFilter {
    /// Smoothing factor
    fn alpha(&self) -> FilterResult<f32>;
    /// Edge-preserving threshold
    fn delta(&self) -> FilterResult<i32>;
    /// Persistency index
    fn persistency(&self) -> FilterResult<i32>;
    /// Range-check and apply a smoothing factor
    fn set_alpha(&self, alpha: f32) -> FilterResult<()>;
    /// Range-check and apply a threshold
    fn set_delta(&self, delta: i32) -> FilterResult<()>;
    /// Range-check and apply a persistency index
    fn set_persistency(&self, persistency: i32) -> FilterResult<()>;
}
