//! Option Model
//!
//! A named, typed, ranged configuration value. The model itself stores no
//! value: reads and writes go through the getter and setter it was built
//! with, which a filter wires to its own state (the remote proxy, or the
//! offline cache). The model adds what every option needs regardless of
//! backing: metadata, the enabled / read-only gates, range checking before
//! the setter is ever called, and access to change notifications.

use core::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use super::descriptor::{OptionDescriptor, OptionRange};
use super::id::OptionId;
use super::value::{OptionKind, OptionValue};
use super::watcher::{OptionWatch, OptionsWatcher, Subscription};
use crate::errors::{FilterError, FilterResult};

/// Reads the current value from the backing store
pub type OptionGetter = Box<dyn Fn() -> FilterResult<OptionValue> + Send + Sync>;

/// Writes an already range-checked value to the backing store
pub type OptionSetter = Box<dyn Fn(OptionValue) -> FilterResult<()> + Send + Sync>;

/// One option of one filter
pub struct OptionModel {
    id: OptionId,
    descriptor: OptionDescriptor,
    read_only: bool,
    enabled: AtomicBool,
    getter: OptionGetter,
    setter: OptionSetter,
    watcher: Weak<OptionsWatcher>,
}

impl OptionModel {
    /// Build a model over a getter and setter
    pub fn new(
        id: OptionId,
        descriptor: OptionDescriptor,
        getter: OptionGetter,
        setter: OptionSetter,
    ) -> Self {
        Self {
            id,
            descriptor,
            read_only: false,
            enabled: AtomicBool::new(true),
            getter,
            setter,
            watcher: Weak::new(),
        }
    }

    /// Route change notifications through `watcher`
    pub fn with_watcher(mut self, watcher: &Arc<OptionsWatcher>) -> Self {
        self.watcher = Arc::downgrade(watcher);
        self
    }

    /// Mark the option read-only
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Process-wide id of this option's name
    pub fn id(&self) -> OptionId {
        self.id
    }

    /// Name as sent on the wire
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Human-readable description, if the device gave one
    pub fn description(&self) -> Option<&str> {
        self.descriptor.description.as_deref()
    }

    /// Value type
    pub fn kind(&self) -> OptionKind {
        self.descriptor.kind
    }

    /// Declared range, with unbounded sides widened
    pub fn range(&self) -> OptionRange {
        self.descriptor.range()
    }

    /// Full declaration as advertised
    pub fn descriptor(&self) -> &OptionDescriptor {
        &self.descriptor
    }

    /// Whether writes are refused outright
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Whether writes are currently allowed
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Enable or disable writes to this option
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Current value from the backing store
    pub fn query(&self) -> FilterResult<OptionValue> {
        (self.getter)()
    }

    /// Range-check and write a new value
    ///
    /// Rejects disabled and read-only options, values of the wrong kind and
    /// out-of-range values before the setter runs.
    pub fn set(&self, value: impl Into<OptionValue>) -> FilterResult<()> {
        if self.read_only {
            return Err(FilterError::ReadOnly(self.descriptor.name.clone()));
        }
        if !self.is_enabled() {
            return Err(FilterError::OptionDisabled(self.descriptor.name.clone()));
        }
        let value = self.descriptor.check(value.into())?;
        (self.setter)(value)
    }

    /// Call `callback` with each new value the device reports
    pub fn on_change<F>(&self, callback: F) -> FilterResult<Subscription>
    where
        F: Fn(OptionValue) + Send + Sync + 'static,
    {
        self.live_watcher()?
            .subscribe(self.id, move |_, value| callback(value))
    }

    /// Channel yielding each new value the device reports
    pub fn watch(&self) -> FilterResult<OptionWatch> {
        self.live_watcher()?.watch(self.id)
    }

    fn live_watcher(&self) -> FilterResult<Arc<OptionsWatcher>> {
        self.watcher
            .upgrade()
            .ok_or_else(|| FilterError::Destroyed(self.descriptor.name.clone()))
    }
}

impl fmt::Debug for OptionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionModel")
            .field("id", &self.id)
            .field("name", &self.descriptor.name)
            .field("kind", &self.descriptor.kind)
            .field("read_only", &self.read_only)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
