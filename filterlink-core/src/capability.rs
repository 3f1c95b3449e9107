//! Capability Registry
//!
//! ## Overview
//!
//! Generic code holds sensors and filters as `&dyn Any` and asks: "does this
//! object support embedded filters?", "is this filter a temporal filter?".
//! The registry answers without a type hierarchy and without the querying
//! code knowing any concrete type.
//!
//! Each answer comes from an accessor registered once per
//! `(object type, capability)` pair:
//!
//! ```text
//! (TypeId::of::<O>(), TypeId::of::<C>())  ──>  fn(&O) -> Option<&C::Target>
//! ```
//!
//! A query is one hash lookup plus a downcast. Unsupported objects get
//! `None` without allocating and without touching the wire.
//!
//! ## Usage Example
//!
//! ```rust
//! use filterlink_core::capability::{Capability, CapabilityRegistry};
//!
//! trait Greeter { fn greet(&self) -> &'static str; }
//! struct Hello;
//! impl Greeter for Hello { fn greet(&self) -> &'static str { "hello" } }
//!
//! struct Greets;
//! impl Capability for Greets {
//!     type Target = dyn Greeter;
//!     const NAME: &'static str = "greets";
//! }
//!
//! let registry = CapabilityRegistry::new();
//! registry.register::<Hello, Greets>(|h| Some(h)).unwrap();
//!
//! let object: &dyn std::any::Any = &Hello;
//! assert_eq!(registry.query::<Greets>(object).map(|g| g.greet()), Some("hello"));
//! assert!(registry.query::<Greets>(&42u32).is_none());
//! ```

use core::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::errors::{FilterError, FilterResult};
use crate::filter::{DecimationControl, TemporalControl};
use crate::sensor::{
    EmbeddedFilterSensor, GetEmbeddedFilters, QueryEmbeddedFilters, SupportedEmbeddedFilters,
};

/// Marker naming one optional interface
pub trait Capability: 'static {
    /// Interface handed out when the object supports the capability
    type Target: ?Sized + 'static;

    /// Name for diagnostics
    const NAME: &'static str;
}

/// Type-erased call through a registered accessor; the accessor itself is
/// stored boxed beside it as `fn(&O) -> Option<&C::Target>`.
struct Thunk<C: Capability> {
    call: for<'a, 'b> fn(
        &'a (dyn Any + 'static),
        &'b (dyn Any + Send + Sync + 'static),
    ) -> Option<&'a C::Target>,
    accessor: Box<dyn Any + Send + Sync>,
}

fn call_accessor<'a, O: Any, C: Capability>(
    object: &'a (dyn Any + 'static),
    accessor: &(dyn Any + Send + Sync + 'static),
) -> Option<&'a C::Target> {
    let accessor = accessor.downcast_ref::<fn(&O) -> Option<&C::Target>>()?;
    let object = object.downcast_ref::<O>()?;
    accessor(object)
}

/// Thread-safe map from (object type, capability) to accessor
pub struct CapabilityRegistry {
    entries: RwLock<HashMap<(TypeId, TypeId), Box<dyn Any + Send + Sync>>>,
}

impl CapabilityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register how objects of type `O` provide capability `C`
    ///
    /// Registering the same pair twice fails.
    pub fn register<O: Any, C: Capability>(
        &self,
        accessor: fn(&O) -> Option<&C::Target>,
    ) -> FilterResult<()> {
        let key = (TypeId::of::<O>(), TypeId::of::<C>());
        let mut entries = self.entries.write()?;
        if entries.contains_key(&key) {
            return Err(FilterError::DuplicateCapability {
                object: type_name::<O>(),
                capability: C::NAME,
            });
        }
        let thunk = Thunk::<C> {
            call: call_accessor::<O, C>,
            accessor: Box::new(accessor),
        };
        entries.insert(key, Box::new(thunk));
        Ok(())
    }

    /// Obtain capability `C` from an object, if its type registered one
    pub fn query<'a, C: Capability>(&self, object: &'a (dyn Any + 'static)) -> Option<&'a C::Target> {
        let key = ((*object).type_id(), TypeId::of::<C>());
        let entries = self.entries.read().ok()?;
        let thunk = entries.get(&key)?.downcast_ref::<Thunk<C>>()?;
        (thunk.call)(object, thunk.accessor.as_ref())
    }

    /// Does the object's type provide capability `C`?
    pub fn supports<C: Capability>(&self, object: &(dyn Any + 'static)) -> bool {
        self.query::<C>(object).is_some()
    }

    /// Number of registered (object type, capability) pairs
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Legacy binary set/get/supports surface of a sensor
pub struct EmbeddedFilterAccess;

impl Capability for EmbeddedFilterAccess {
    type Target = dyn EmbeddedFilterSensor;
    const NAME: &'static str = "embedded filter sensor";
}

/// Enumerate a sensor's filters
pub struct QueryFilters;

impl Capability for QueryFilters {
    type Target = dyn QueryEmbeddedFilters;
    const NAME: &'static str = "query embedded filters";
}

/// Fetch a sensor's filter by type
pub struct GetFilters;

impl Capability for GetFilters {
    type Target = dyn GetEmbeddedFilters;
    const NAME: &'static str = "get embedded filters";
}

/// List a sensor's advertised filter types
pub struct SupportedFilters;

impl Capability for SupportedFilters {
    type Target = dyn SupportedEmbeddedFilters;
    const NAME: &'static str = "supported embedded filters";
}

/// Decimation-specific accessors of a filter
pub struct DecimationAccess;

impl Capability for DecimationAccess {
    type Target = dyn DecimationControl;
    const NAME: &'static str = "decimation filter";
}

/// Temporal-specific accessors of a filter
pub struct TemporalAccess;

impl Capability for TemporalAccess {
    type Target = dyn TemporalControl;
    const NAME: &'static str = "temporal filter";
}
