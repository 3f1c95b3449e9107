//! Sensor-side filter contracts
//!
//! A sensor object offers some or all of these through the capability
//! registry. Consumers never name the sensor's concrete type.

use std::sync::Arc;

use crate::buffer::ParameterBuffer;
use crate::errors::FilterResult;
use crate::filter::EmbeddedFilter;
use crate::filter_type::FilterType;

/// Legacy binary surface: whole parameter buffers per filter type
pub trait EmbeddedFilterSensor: Send + Sync {
    /// Decode and apply a parameter buffer of the stated type
    fn set_filter(&self, filter: FilterType, bytes: &[u8]) -> FilterResult<()>;

    /// Current parameters of a filter type as a buffer
    fn get_filter(&self, filter: FilterType) -> FilterResult<ParameterBuffer>;

    /// Whether the sensor carries this filter type
    fn supports_filter(&self, filter: FilterType) -> bool;
}

/// Enumerate every filter the sensor exposes
pub trait QueryEmbeddedFilters: Send + Sync {
    /// Every filter, in advertisement order
    fn query_embedded_filters(&self) -> Vec<Arc<dyn EmbeddedFilter>>;
}

/// Fetch one filter by type
pub trait GetEmbeddedFilters: Send + Sync {
    /// The filter of this type, or `Unsupported`
    fn embedded_filter(&self, filter: FilterType) -> FilterResult<Arc<dyn EmbeddedFilter>>;
}

/// Filter types the device advertised
pub trait SupportedEmbeddedFilters: Send + Sync {
    /// Advertised filter types
    fn supported_filters(&self) -> Vec<FilterType>;
}
