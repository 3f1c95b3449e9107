//! Sensor with embedded filters
//!
//! A [`RemoteSensor`] owns the filters its device advertised and exposes
//! them through the sensor contracts of `filterlink-core`:
//!
//! | Capability             | Contract                     |
//! |------------------------|------------------------------|
//! | `EmbeddedFilterAccess` | binary set / get / supports  |
//! | `QueryFilters`         | enumerate filters            |
//! | `GetFilters`           | fetch a filter by type       |
//! | `SupportedFilters`     | list advertised filter types |
//!
//! Which filter implementation backs each type is decided once, at build
//! time. With a transport, filters delegate to the device. Without one
//! they stay remote but unwired (first use fails with `NotWired`), unless
//! `offline_fallback` is set, in which case offline filters are built from
//! the advertised values.
//!
//! Dropping the sensor destroys its filters before it releases the
//! notification loop.

use std::sync::{Arc, Mutex};

use filterlink_core::capability::{
    CapabilityRegistry, EmbeddedFilterAccess, GetFilters, QueryFilters, SupportedFilters,
};
use filterlink_core::codec::{self, FilterParams, ParameterCodec};
use filterlink_core::local::{LocalDecimationFilter, LocalFilter, LocalTemporalFilter};
use filterlink_core::persistence::{restore_filter_settings, save_filter_settings, SettingsStore};
use filterlink_core::sensor::{
    EmbeddedFilterSensor, GetEmbeddedFilters, QueryEmbeddedFilters, SupportedEmbeddedFilters,
};
use filterlink_core::{EmbeddedFilter, FilterError, FilterResult, FilterType, ParameterBuffer};
use log::info;
use thiserror::Error;

use crate::config::{ConfigError, SyncConfig};
use crate::delivery::{LoopHandle, NotificationLoop};
use crate::filter::{DecimationFilter, RemoteFilter, TemporalFilter};
use crate::messages::FilterProps;
use crate::state::RemoteFilterState;
use crate::FilterTransport;

/// Errors building a sensor
#[derive(Debug, Error)]
pub enum SensorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Remote-only operations, independent of the filter type
trait SyncedFilter: Send + Sync {
    fn wire(&self, transport: Arc<dyn FilterTransport>) -> FilterResult<()>;
    fn subscribe_notifications(
        &self,
        notifications: &NotificationLoop,
        topic: &str,
    ) -> FilterResult<()>;
    fn refresh(&self) -> FilterResult<usize>;
}

impl<C> SyncedFilter for RemoteFilter<C>
where
    C: ParameterCodec + Send + Sync + 'static,
{
    fn wire(&self, transport: Arc<dyn FilterTransport>) -> FilterResult<()> {
        RemoteFilter::wire(self, transport)
    }

    fn subscribe_notifications(
        &self,
        notifications: &NotificationLoop,
        topic: &str,
    ) -> FilterResult<()> {
        RemoteFilter::subscribe_notifications(self, notifications, topic)
    }

    fn refresh(&self) -> FilterResult<usize> {
        RemoteFilter::refresh(self)
    }
}

enum Slot {
    Decimation(Arc<DecimationFilter>),
    Temporal(Arc<TemporalFilter>),
    LocalDecimation(Arc<LocalDecimationFilter>),
    LocalTemporal(Arc<LocalTemporalFilter>),
}

impl Slot {
    fn remote(props: FilterProps, control_topic: &str) -> FilterResult<Self> {
        Ok(match props.filter_type {
            FilterType::Decimation => {
                Slot::Decimation(Arc::new(RemoteFilter::from_props(props, control_topic)?))
            }
            FilterType::Temporal => {
                Slot::Temporal(Arc::new(RemoteFilter::from_props(props, control_topic)?))
            }
        })
    }

    fn local(props: FilterProps) -> FilterResult<Self> {
        let state = RemoteFilterState::from_props(props)?;
        let name = state.name()?;
        Ok(match codec::from_options(state.filter_type()?, state.current_values())? {
            FilterParams::Decimation(params) => {
                Slot::LocalDecimation(Arc::new(LocalFilter::with_params(name, params)?))
            }
            FilterParams::Temporal(params) => {
                Slot::LocalTemporal(Arc::new(LocalFilter::with_params(name, params)?))
            }
        })
    }

    fn filter(&self) -> &dyn EmbeddedFilter {
        match self {
            Slot::Decimation(f) => &**f,
            Slot::Temporal(f) => &**f,
            Slot::LocalDecimation(f) => &**f,
            Slot::LocalTemporal(f) => &**f,
        }
    }

    fn shared(&self) -> Arc<dyn EmbeddedFilter> {
        match self {
            Slot::Decimation(f) => f.clone(),
            Slot::Temporal(f) => f.clone(),
            Slot::LocalDecimation(f) => f.clone(),
            Slot::LocalTemporal(f) => f.clone(),
        }
    }

    fn synced(&self) -> Option<&dyn SyncedFilter> {
        match self {
            Slot::Decimation(f) => Some(&**f),
            Slot::Temporal(f) => Some(&**f),
            Slot::LocalDecimation(_) | Slot::LocalTemporal(_) => None,
        }
    }

    fn begin_destruction(&self) {
        match self {
            Slot::Decimation(f) => f.begin_destruction(),
            Slot::Temporal(f) => f.begin_destruction(),
            Slot::LocalDecimation(f) => f.begin_destruction(),
            Slot::LocalTemporal(f) => f.begin_destruction(),
        }
    }
}

/// Builder for [`RemoteSensor`]
pub struct RemoteSensorBuilder {
    name: String,
    config: SyncConfig,
    props: Vec<FilterProps>,
    transport: Option<Arc<dyn FilterTransport>>,
    notifications: Option<Arc<NotificationLoop>>,
}

impl RemoteSensorBuilder {
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a filter the device advertised
    pub fn filter(mut self, props: FilterProps) -> Self {
        self.props.push(props);
        self
    }

    /// Wire the transport at build time
    pub fn transport(mut self, transport: Arc<dyn FilterTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Receive device pushes through a shared notification loop
    pub fn notifications(mut self, notifications: &Arc<NotificationLoop>) -> Self {
        self.notifications = Some(notifications.clone());
        self
    }

    pub fn build(self) -> Result<RemoteSensor, SensorError> {
        self.config.validate()?;
        let offline = self.transport.is_none() && self.config.offline_fallback;
        let control_topic = self.config.control_topic();

        let mut slots: Vec<Slot> = Vec::with_capacity(self.props.len());
        for props in self.props {
            if slots.iter().any(|s| s.filter().filter_type() == props.filter_type) {
                return Err(FilterError::AlreadyInitialized {
                    filter: props.name,
                    what: "filter type",
                }
                .into());
            }
            let slot = if offline {
                Slot::local(props)?
            } else {
                Slot::remote(props, &control_topic)?
            };
            slots.push(slot);
        }

        let sensor = RemoteSensor {
            name: self.name,
            config: self.config,
            slots,
            loop_handle: Mutex::new(None),
        };
        if let Some(transport) = self.transport {
            sensor.wire(transport)?;
        }
        if let Some(notifications) = self.notifications {
            sensor.attach_notifications(&notifications)?;
        }
        info!(
            "{}: {} embedded filter(s){}",
            sensor.name,
            sensor.slots.len(),
            if offline { ", offline" } else { "" }
        );
        Ok(sensor)
    }
}

/// Sensor exposing its device's embedded filters
pub struct RemoteSensor {
    name: String,
    config: SyncConfig,
    slots: Vec<Slot>,
    loop_handle: Mutex<Option<LoopHandle>>,
}

impl RemoteSensor {
    pub fn builder(name: impl Into<String>) -> RemoteSensorBuilder {
        RemoteSensorBuilder {
            name: name.into(),
            config: SyncConfig::new(),
            props: Vec::new(),
            transport: None,
            notifications: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// True when the filters are offline implementations
    pub fn is_offline(&self) -> bool {
        self.slots.iter().any(|s| s.synced().is_none())
    }

    /// Attach a transport to every remote filter
    pub fn wire(&self, transport: Arc<dyn FilterTransport>) -> FilterResult<()> {
        for synced in self.slots.iter().filter_map(Slot::synced) {
            synced.wire(transport.clone())?;
        }
        Ok(())
    }

    /// Route device pushes to every remote filter and hold the loop open
    pub fn attach_notifications(&self, notifications: &Arc<NotificationLoop>) -> FilterResult<()> {
        let topic = self.config.notification_topic();
        let mut attached = 0;
        for synced in self.slots.iter().filter_map(Slot::synced) {
            synced.subscribe_notifications(notifications, &topic)?;
            attached += 1;
        }
        if attached > 0 {
            let mut handle = self.loop_handle.lock()?;
            if handle.is_none() {
                *handle = Some(notifications.acquire()?);
            }
        }
        Ok(())
    }

    /// Re-read every remote filter; returns the callbacks run
    pub fn refresh(&self) -> FilterResult<usize> {
        let mut callbacks = 0;
        for synced in self.slots.iter().filter_map(Slot::synced) {
            callbacks += synced.refresh()?;
        }
        Ok(callbacks)
    }

    /// Settings prefix of one filter: `<sensor>.<filter>`
    pub fn full_filter_name(&self, filter: &dyn EmbeddedFilter) -> String {
        format!("{}.{}", self.name, filter.name())
    }

    /// Persist every filter's options and enable flag
    pub fn save_settings(&self, store: &mut dyn SettingsStore) -> FilterResult<usize> {
        let mut written = 0;
        for slot in &self.slots {
            let filter = slot.filter();
            let full_name = self.full_filter_name(filter);
            written += save_filter_settings(&full_name, filter, store, filter.is_enabled())?;
        }
        Ok(written)
    }

    /// Restore persisted settings; out-of-range values are skipped
    ///
    /// Enable flags that differ from the device are applied through the
    /// standard set path, and their failures are reported.
    pub fn restore_settings(&self, store: &dyn SettingsStore) -> FilterResult<()> {
        for slot in &self.slots {
            let filter = slot.filter();
            let full_name = self.full_filter_name(filter);
            let current = filter.is_enabled();
            let enabled = restore_filter_settings(&full_name, filter, store, current);
            if enabled != current {
                filter.enable(enabled)?;
            }
        }
        Ok(())
    }

    fn slot(&self, filter_type: FilterType) -> FilterResult<&Slot> {
        self.slots
            .iter()
            .find(|s| s.filter().filter_type() == filter_type)
            .ok_or(FilterError::Unsupported(filter_type))
    }
}

impl Drop for RemoteSensor {
    fn drop(&mut self) {
        for slot in &self.slots {
            slot.begin_destruction();
        }
        if let Ok(handle) = self.loop_handle.get_mut() {
            handle.take();
        }
    }
}

impl EmbeddedFilterSensor for RemoteSensor {
    fn set_filter(&self, filter_type: FilterType, bytes: &[u8]) -> FilterResult<()> {
        self.slot(filter_type)?.filter().set(bytes)
    }

    fn get_filter(&self, filter_type: FilterType) -> FilterResult<ParameterBuffer> {
        self.slot(filter_type)?.filter().get()
    }

    fn supports_filter(&self, filter_type: FilterType) -> bool {
        self.slot(filter_type).is_ok()
    }
}

impl QueryEmbeddedFilters for RemoteSensor {
    fn query_embedded_filters(&self) -> Vec<Arc<dyn EmbeddedFilter>> {
        self.slots.iter().map(Slot::shared).collect()
    }
}

impl GetEmbeddedFilters for RemoteSensor {
    fn embedded_filter(&self, filter_type: FilterType) -> FilterResult<Arc<dyn EmbeddedFilter>> {
        self.slot(filter_type).map(Slot::shared)
    }
}

impl SupportedEmbeddedFilters for RemoteSensor {
    fn supported_filters(&self) -> Vec<FilterType> {
        self.slots.iter().map(|s| s.filter().filter_type()).collect()
    }
}

/// Register the sensor-level capabilities of [`RemoteSensor`]
pub fn register_capabilities(registry: &CapabilityRegistry) -> FilterResult<()> {
    registry.register::<RemoteSensor, EmbeddedFilterAccess>(|s| Some(s))?;
    registry.register::<RemoteSensor, QueryFilters>(|s| Some(s))?;
    registry.register::<RemoteSensor, GetFilters>(|s| Some(s))?;
    registry.register::<RemoteSensor, SupportedFilters>(|s| Some(s))?;
    Ok(())
}
