//! Remote filters
//!
//! A [`RemoteFilter`] is the authoritative implementation of the filter
//! contract: every value lives on the device, and the filter keeps only the
//! cache its proxy agreed with the device.
//!
//! ```text
//! declare ──> Declared ──populate──> Populated ──begin_destruction──> Destroyed
//!                          (once)
//! ```
//!
//! Local sets do not notify watchers; only device pushes and refreshes do,
//! and only for the ids whose value changed.

use core::any::Any;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use filterlink_core::capability::{CapabilityRegistry, DecimationAccess, TemporalAccess};
use filterlink_core::codec::{Decimation, ParameterCodec, Temporal};
use filterlink_core::constants::{ALPHA, DELTA, PERSISTENCY};
use filterlink_core::options::{register_option_by_name, NamedValue};
use filterlink_core::{
    DecimationControl, EmbeddedFilter, FilterError, FilterResult, FilterState, FilterType,
    OptionId, OptionModel, OptionValue, OptionsWatcher, ParameterBuffer, TemporalControl,
};
use log::{debug, info};

use crate::delivery::{NotificationLoop, NotificationTarget, Route};
use crate::messages::FilterProps;
use crate::proxy::RemoteFilterProxy;
use crate::state::RemoteFilterState;
use crate::FilterTransport;

struct RemoteShared<C: ParameterCodec> {
    proxy: RemoteFilterProxy<C>,
    watcher: Arc<OptionsWatcher>,
    destroyed: AtomicBool,
}

impl<C: ParameterCodec> RemoteShared<C> {
    fn ensure_live(&self) -> FilterResult<()> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(FilterError::Destroyed(self.proxy.name().to_string()));
        }
        Ok(())
    }

    fn set_option(&self, name: &str, value: OptionValue) -> FilterResult<()> {
        self.ensure_live()?;
        self.proxy.set_option(name, value)
    }

    fn publish(&self, changed: &[(OptionId, OptionValue)]) -> usize {
        if changed.is_empty() {
            return 0;
        }
        self.watcher.dispatch(changed)
    }
}

impl<C> NotificationTarget for RemoteShared<C>
where
    C: ParameterCodec + Send + Sync + 'static,
{
    fn deliver(&self, options: &[NamedValue]) -> FilterResult<usize> {
        self.ensure_live()?;
        let changed = self.proxy.apply_notification(options)?;
        Ok(self.publish(&changed))
    }
}

/// Filter whose parameters live on the device
pub struct RemoteFilter<C: ParameterCodec> {
    shared: Arc<RemoteShared<C>>,
    options: OnceLock<Vec<OptionModel>>,
    route: Mutex<Option<Route>>,
}

/// Remote decimation filter
pub type DecimationFilter = RemoteFilter<Decimation>;

/// Remote temporal filter
pub type TemporalFilter = RemoteFilter<Temporal>;

impl<C> RemoteFilter<C>
where
    C: ParameterCodec + Send + Sync + 'static,
{
    /// Wrap a declared state; options are not modelled until `populate`
    pub fn declare(
        state: RemoteFilterState,
        control_topic: impl Into<String>,
    ) -> FilterResult<Self> {
        let proxy = RemoteFilterProxy::new(state, control_topic)?;
        Ok(Self {
            shared: Arc::new(RemoteShared {
                proxy,
                watcher: OptionsWatcher::new(),
                destroyed: AtomicBool::new(false),
            }),
            options: OnceLock::new(),
            route: Mutex::new(None),
        })
    }

    /// Declare from an advertisement and populate right away
    pub fn from_props(props: FilterProps, control_topic: impl Into<String>) -> FilterResult<Self> {
        let filter = Self::declare(RemoteFilterState::from_props(props)?, control_topic)?;
        filter.populate()?;
        Ok(filter)
    }

    /// Wrap every declared option in an option model
    ///
    /// Happens once; a second call fails with `AlreadyInitialized`.
    pub fn populate(&self) -> FilterResult<()> {
        if self.options.get().is_some() {
            return Err(self.already_populated());
        }
        let declarations = self
            .shared
            .proxy
            .with_state(|state| state.declarations().to_vec())?;
        let models = declarations
            .into_iter()
            .map(|descriptor| {
                let id = register_option_by_name(&descriptor.name);
                let read: Weak<RemoteShared<C>> = Arc::downgrade(&self.shared);
                let write = read.clone();
                let read_name = descriptor.name.clone();
                let write_name = descriptor.name.clone();
                OptionModel::new(
                    id,
                    descriptor,
                    Box::new(move || upgrade(&read)?.proxy.value(&read_name)),
                    Box::new(move |value| upgrade(&write)?.set_option(&write_name, value)),
                )
                .with_watcher(&self.shared.watcher)
            })
            .collect::<Vec<_>>();
        let count = models.len();
        self.options
            .set(models)
            .map_err(|_| self.already_populated())?;
        info!("{}: populated with {} option(s)", self.name(), count);
        Ok(())
    }

    fn already_populated(&self) -> FilterError {
        FilterError::AlreadyInitialized {
            filter: self.name().to_string(),
            what: "options",
        }
    }

    /// Attach the transport
    pub fn wire(&self, transport: Arc<dyn FilterTransport>) -> FilterResult<()> {
        self.shared.proxy.wire(transport)
    }

    pub fn is_wired(&self) -> bool {
        self.shared.proxy.is_wired()
    }

    /// Receive device pushes for this filter from `notifications`
    pub fn subscribe_notifications(
        &self,
        notifications: &NotificationLoop,
        topic: &str,
    ) -> FilterResult<()> {
        self.shared.ensure_live()?;
        let target: Arc<dyn NotificationTarget> = self.shared.clone();
        let route = notifications.route(topic, self.name(), Arc::downgrade(&target))?;
        *self.route.lock()? = Some(route);
        Ok(())
    }

    /// Re-read all options from the device and notify changed ids
    pub fn refresh(&self) -> FilterResult<usize> {
        self.shared.ensure_live()?;
        let changed = self.shared.proxy.refresh()?;
        debug!("{}: refresh changed {} option(s)", self.name(), changed.len());
        Ok(self.shared.publish(&changed))
    }

    /// Apply a device-originated change directly
    pub fn handle_notification(&self, options: &[NamedValue]) -> FilterResult<usize> {
        self.shared.deliver(options)
    }

    /// Cached values as typed parameters
    pub fn params(&self) -> FilterResult<C::Params> {
        self.shared.proxy.params()
    }

    /// Advertisement form with current cached values
    pub fn props(&self) -> FilterResult<FilterProps> {
        self.shared.proxy.with_state(RemoteFilterState::to_props)?
    }

    pub fn watcher(&self) -> &Arc<OptionsWatcher> {
        &self.shared.watcher
    }

    fn set_named(&self, name: &str, value: OptionValue) -> FilterResult<()> {
        let id = register_option_by_name(name);
        self.option(id)?.set(value)
    }
}

fn upgrade<T>(weak: &Weak<T>) -> FilterResult<Arc<T>> {
    weak.upgrade()
        .ok_or_else(|| FilterError::Destroyed("remote filter".to_string()))
}

impl<C: ParameterCodec> RemoteFilter<C> {
    /// Detach from notifications and retract every subscription
    ///
    /// Later sets fail with `Destroyed`; later notifications are dropped.
    pub fn begin_destruction(&self) {
        self.shared.destroyed.store(true, Ordering::Release);
        if let Ok(mut route) = self.route.lock() {
            route.take();
        }
        self.shared.watcher.begin_destruction();
    }
}

impl<C: ParameterCodec> Drop for RemoteFilter<C> {
    fn drop(&mut self) {
        self.begin_destruction();
    }
}

impl<C> EmbeddedFilter for RemoteFilter<C>
where
    C: ParameterCodec + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        self.shared.proxy.name()
    }

    fn filter_type(&self) -> FilterType {
        C::FILTER_TYPE
    }

    fn state(&self) -> FilterState {
        if self.shared.destroyed.load(Ordering::Acquire) {
            FilterState::Destroyed
        } else if self.options.get().is_some() {
            FilterState::Populated
        } else {
            FilterState::Declared
        }
    }

    fn is_enabled(&self) -> bool {
        self.params().map(|p| C::enabled(&p)).unwrap_or(false)
    }

    fn enable(&self, enabled: bool) -> FilterResult<()> {
        self.option(OptionId::ENABLED)?.set(enabled)
    }

    fn supported_options(&self) -> BTreeSet<OptionId> {
        self.shared
            .proxy
            .with_state(|state| {
                state
                    .declarations()
                    .iter()
                    .map(|d| register_option_by_name(&d.name))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn option(&self, id: OptionId) -> FilterResult<&OptionModel> {
        let options = self
            .options
            .get()
            .ok_or_else(|| FilterError::NotPopulated(self.name().to_string()))?;
        options
            .iter()
            .find(|o| o.id() == id)
            .ok_or(FilterError::OptionNotFound(id))
    }

    fn get(&self) -> FilterResult<ParameterBuffer> {
        C::encode(&self.params()?)
    }

    fn set(&self, bytes: &[u8]) -> FilterResult<()> {
        self.shared.ensure_live()?;
        let params = C::decode(bytes)?;
        self.shared.proxy.apply(&params)
    }

    fn as_any(&self) -> &(dyn Any + 'static) {
        self
    }
}

impl DecimationControl for RemoteFilter<Decimation> {
    fn magnitude(&self) -> FilterResult<u8> {
        Ok(self.params()?.magnitude)
    }
}

impl TemporalControl for RemoteFilter<Temporal> {
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

/// Register the filter-specific capabilities of remote filters
pub fn register_capabilities(registry: &CapabilityRegistry) -> FilterResult<()> {
    registry.register::<DecimationFilter, DecimationAccess>(|f| Some(f))?;
    registry.register::<TemporalFilter, TemporalAccess>(|f| Some(f))?;
    Ok(())
}
