//! Offline filters
//!
//! A `LocalFilter` keeps its parameters in memory and is its own source of
//! truth. Sensors fall back to it when no transport is wired, and tests use
//! it to exercise option models without a device. Because nothing else will
//! ever report a change, local sets notify watchers directly.

use core::any::Any;
use core::marker::PhantomData;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::buffer::ParameterBuffer;
use crate::capability::{CapabilityRegistry, DecimationAccess, TemporalAccess};
use crate::codec::utils::overlay;
use crate::codec::{Decimation, ParameterCodec, Temporal};
use crate::constants::{ALPHA, DELTA, PERSISTENCY};
use crate::errors::{FilterError, FilterResult};
use crate::filter::{DecimationControl, EmbeddedFilter, FilterState, TemporalControl};
use crate::filter_type::FilterType;
use crate::options::{
    find_value, register_option_by_name, OptionId, OptionModel, OptionValue, OptionsWatcher,
};

struct LocalShared<C: ParameterCodec> {
    name: String,
    params: Mutex<C::Params>,
    watcher: Arc<OptionsWatcher>,
    destroyed: AtomicBool,
    _codec: PhantomData<fn() -> C>,
}

impl<C: ParameterCodec> LocalShared<C> {
    fn value_of(&self, name: &str) -> FilterResult<OptionValue> {
        let params = self.params.lock()?;
        find_value(&C::to_options(&params), name)
            .copied()
            .ok_or_else(|| FilterError::UnknownOption {
                filter: C::FILTER_TYPE,
                name: name.to_string(),
            })
    }

    fn set_value(&self, name: &str, value: OptionValue) -> FilterResult<()> {
        self.update(|params| {
            let mut values = C::to_options(params);
            overlay(C::FILTER_TYPE, &mut values, name, value)?;
            C::from_options(&values)
        })
    }

    fn apply(&self, next: C::Params) -> FilterResult<()> {
        self.update(|_| C::validate(&next).map(|_| next))
    }

    /// Read-modify-write under the lock, then notify watchers of changed ids
    fn update<F>(&self, modify: F) -> FilterResult<()>
    where
        F: FnOnce(&C::Params) -> FilterResult<C::Params>,
    {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(FilterError::Destroyed(self.name.clone()));
        }
        let changed: Vec<(OptionId, OptionValue)> = {
            let mut params = self.params.lock()?;
            let next = match modify(&params) {
                Ok(next) => next,
                Err(e) => {
                    log_warn!("{}: rejected local update: {}", self.name, e);
                    return Err(e);
                }
            };
            let before = C::to_options(&params);
            *params = next;
            C::to_options(&params)
                .into_iter()
                .zip(before)
                .filter(|(after, before)| after.value != before.value)
                .map(|(after, _)| (register_option_by_name(&after.name), after.value))
                .collect()
        };
        log_debug!("{}: {} option(s) changed locally", self.name, changed.len());
        self.watcher.dispatch(&changed);
        Ok(())
    }
}

/// Filter whose parameters live in this process
pub struct LocalFilter<C: ParameterCodec> {
    shared: Arc<LocalShared<C>>,
    options: Vec<OptionModel>,
}

/// Offline decimation filter
pub type LocalDecimationFilter = LocalFilter<Decimation>;

/// Offline temporal filter
pub type LocalTemporalFilter = LocalFilter<Temporal>;

impl<C: ParameterCodec> LocalFilter<C> {
    /// Filter starting from the device defaults
    pub fn new(name: &str) -> Self {
        Self::build(name, C::defaults())
    }

    /// Filter starting from explicit parameters
    pub fn with_params(name: &str, params: C::Params) -> FilterResult<Self> {
        C::validate(&params)?;
        Ok(Self::build(name, params))
    }

    fn build(name: &str, params: C::Params) -> Self {
        let shared = Arc::new(LocalShared::<C> {
            name: name.to_string(),
            params: Mutex::new(params),
            watcher: OptionsWatcher::new(),
            destroyed: AtomicBool::new(false),
            _codec: PhantomData,
        });
        let options = C::declarations()
            .into_iter()
            .map(|descriptor| {
                let id = register_option_by_name(&descriptor.name);
                let read: Weak<LocalShared<C>> = Arc::downgrade(&shared);
                let write = read.clone();
                let read_name = descriptor.name.clone();
                let write_name = descriptor.name.clone();
                OptionModel::new(
                    id,
                    descriptor,
                    Box::new(move || upgrade(&read)?.value_of(&read_name)),
                    Box::new(move |value| upgrade(&write)?.set_value(&write_name, value)),
                )
                .with_watcher(&shared.watcher)
            })
            .collect();
        Self { shared, options }
    }

    /// Current typed parameters
    pub fn params(&self) -> FilterResult<C::Params> {
        Ok(*self.shared.params.lock()?)
    }

    /// Watcher notified of every local change
    pub fn watcher(&self) -> &Arc<OptionsWatcher> {
        &self.shared.watcher
    }

    /// Retract all subscriptions; later sets fail
    pub fn begin_destruction(&self) {
        self.shared.destroyed.store(true, Ordering::Release);
        self.shared.watcher.begin_destruction();
    }

    fn set_named(&self, name: &str, value: OptionValue) -> FilterResult<()> {
        let id = register_option_by_name(name);
        self.options
            .iter()
            .find(|o| o.id() == id)
            .ok_or(FilterError::OptionNotFound(id))?
            .set(value)
    }
}

fn upgrade<T>(weak: &Weak<T>) -> FilterResult<Arc<T>> {
    weak.upgrade()
        .ok_or_else(|| FilterError::Destroyed("local filter".to_string()))
}

impl<C: ParameterCodec> Drop for LocalFilter<C> {
    fn drop(&mut self) {
        self.begin_destruction();
    }
}

impl<C> EmbeddedFilter for LocalFilter<C>
where
    C: ParameterCodec + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.shared.name
    }

    fn filter_type(&self) -> FilterType {
        C::FILTER_TYPE
    }

    fn state(&self) -> FilterState {
        if self.shared.destroyed.load(Ordering::Acquire) {
            FilterState::Destroyed
        } else {
            FilterState::Populated
        }
    }

    fn is_enabled(&self) -> bool {
        self.params().map(|p| C::enabled(&p)).unwrap_or(false)
    }

    fn enable(&self, enabled: bool) -> FilterResult<()> {
        self.option(OptionId::ENABLED)?.set(enabled)
    }

    fn supported_options(&self) -> BTreeSet<OptionId> {
        self.options.iter().map(OptionModel::id).collect()
    }

    fn option(&self, id: OptionId) -> FilterResult<&OptionModel> {
        self.options
            .iter()
            .find(|o| o.id() == id)
            .ok_or(FilterError::OptionNotFound(id))
    }

    fn get(&self) -> FilterResult<ParameterBuffer> {
        C::encode(&self.params()?)
    }

    fn set(&self, bytes: &[u8]) -> FilterResult<()> {
        let params = C::decode(bytes)?;
        self.shared.apply(params)
    }

    fn as_any(&self) -> &(dyn Any + 'static) {
        self
    }
}

impl DecimationControl for LocalFilter<Decimation> {
    fn magnitude(&self) -> FilterResult<u8> {
        Ok(self.params()?.magnitude)
    }
}

impl TemporalControl for LocalFilter<Temporal> {
    fn alpha(&self) -> FilterResult<f32> {
        Ok(self.params()?.alpha)
    }

    fn delta(&self) -> FilterResult<i32> {
        Ok(self.params()?.delta)
    }

    fn persistency(&self) -> FilterResult<i32> {
        Ok(self.params()?.persistency)
    }

    fn set_alpha(&self, alpha: f32) -> FilterResult<()> {
        self.set_named(ALPHA, alpha.into())
    }

    fn set_delta(&self, delta: i32) -> FilterResult<()> {
        self.set_named(DELTA, delta.into())
    }

    fn set_persistency(&self, persistency: i32) -> FilterResult<()> {
        self.set_named(PERSISTENCY, persistency.into())
    }
}

/// Register the filter-specific capabilities of offline filters
pub fn register_capabilities(registry: &CapabilityRegistry) -> FilterResult<()> {
    registry.register::<LocalDecimationFilter, DecimationAccess>(|f| Some(f))?;
    registry.register::<LocalTemporalFilter, TemporalAccess>(|f| Some(f))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn enable_scenario_on_local_decimation() {
        let filter = LocalDecimationFilter::new("Decimation Filter");
        filter.enable(true).unwrap();
        assert_eq!(filter.get().unwrap(), [1, 2]);
        filter.enable(false).unwrap();
        assert_eq!(filter.get().unwrap(), [0, 2]);
    }

    #[test]
    fn rejected_set_leaves_params_untouched() {
        let filter = LocalTemporalFilter::new("Temporal Filter");
        let before = filter.params().unwrap();
        assert!(filter.set_alpha(1.5).is_err());
        assert!(filter.set_delta(101).is_err());
        assert_eq!(filter.params().unwrap(), before);
        assert_eq!(filter.alpha().unwrap(), 0.4);
    }

    #[test]
    fn local_sets_notify_only_changed_ids() {
        let filter = LocalTemporalFilter::new("Temporal Filter");
        let alpha_hits = Arc::new(AtomicUsize::new(0));
        let delta_hits = Arc::new(AtomicUsize::new(0));
        let (a, d) = (alpha_hits.clone(), delta_hits.clone());
        let _sa = filter
            .option(OptionId::SMOOTH_ALPHA)
            .unwrap()
            .on_change(move |_| {
                a.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        let _sd = filter
            .option(OptionId::SMOOTH_DELTA)
            .unwrap()
            .on_change(move |_| {
                d.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        filter.set_alpha(0.7).unwrap();

        assert_eq!(alpha_hits.load(Ordering::SeqCst), 1);
        assert_eq!(delta_hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn binary_set_applies_whole_layout() {
        let filter = LocalTemporalFilter::new("Temporal Filter");
        let mut raw = [0u8; 13];
        raw[0] = 1;
        raw[1..5].copy_from_slice(&0.25f32.to_le_bytes());
        raw[5..9].copy_from_slice(&50i32.to_le_bytes());
        raw[9..13].copy_from_slice(&6i32.to_le_bytes());
        filter.set(&raw).unwrap();
        assert!(filter.is_enabled());
        assert_eq!(filter.persistency().unwrap(), 6);
        assert_eq!(filter.get().unwrap(), raw);
    }

    #[test]
    fn destroyed_filter_rejects_sets() {
        let filter = LocalDecimationFilter::new("Decimation Filter");
        filter.begin_destruction();
        assert_eq!(filter.state(), FilterState::Destroyed);
        assert!(matches!(filter.enable(true), Err(FilterError::Destroyed(_))));
    }

    #[test]
    fn unadvertised_option_is_not_found() {
        let filter = LocalDecimationFilter::new("Decimation Filter");
        assert_eq!(
            filter.option(OptionId::SMOOTH_ALPHA).unwrap_err(),
            FilterError::OptionNotFound(OptionId::SMOOTH_ALPHA)
        );
        assert_eq!(
            filter.supported_options().into_iter().collect::<Vec<_>>(),
            vec![OptionId::ENABLED, OptionId::MAGNITUDE]
        );
    }

    #[test]
    fn capabilities_resolve_per_variant() {
        let registry = CapabilityRegistry::new();
        register_capabilities(&registry).unwrap();
        let temporal = LocalTemporalFilter::new("Temporal Filter");
        let decimation = LocalDecimationFilter::new("Decimation Filter");

        let control = registry.query::<TemporalAccess>(temporal.as_any()).unwrap();
        assert_eq!(control.delta().unwrap(), 20);
        assert!(registry.query::<TemporalAccess>(decimation.as_any()).is_none());
        assert_eq!(
            registry
                .query::<DecimationAccess>(decimation.as_any())
                .unwrap()
                .magnitude()
                .unwrap(),
            2
        );
    }
}
