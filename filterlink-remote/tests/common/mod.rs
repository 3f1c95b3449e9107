//! Shared fixtures for remote integration tests
//!
//! - A loopback device with both filter types advertised
//! - A sensor wired to it, optionally receiving device pushes
//! - A channel-backed recorder for option callbacks

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use filterlink_core::sensor::GetEmbeddedFilters;
use filterlink_core::{EmbeddedFilter, FilterType, OptionValue};
use filterlink_remote::loopback::LoopbackDevice;
use filterlink_remote::{NotificationLoop, RemoteSensor, SyncConfig};

pub const WAIT: Duration = Duration::from_secs(5);

pub struct Rig {
    pub device: Arc<LoopbackDevice>,
    pub notifications: Arc<NotificationLoop>,
    pub sensor: RemoteSensor,
}

impl Rig {
    pub fn filter(&self, filter_type: FilterType) -> Arc<dyn EmbeddedFilter> {
        self.sensor.embedded_filter(filter_type).unwrap()
    }
}

/// Device and sensor on `config`, sharing `notifications`
pub fn rig_on(config: SyncConfig, notifications: &Arc<NotificationLoop>) -> Rig {
    let device = Arc::new(LoopbackDevice::new(&config));
    device.connect_notifications(notifications.sender());
    let sensor = RemoteSensor::builder("Depth Sensor")
        .config(config)
        .filter(device.advertise(FilterType::Decimation, "Decimation Filter"))
        .filter(device.advertise(FilterType::Temporal, "Temporal Filter"))
        .transport(device.clone())
        .notifications(notifications)
        .build()
        .unwrap();
    Rig {
        device,
        notifications: notifications.clone(),
        sensor,
    }
}

/// Wired sensor receiving pushes through its own notification loop
pub fn rig() -> Rig {
    let config = SyncConfig::new();
    let notifications = NotificationLoop::from_config(&config);
    rig_on(config, &notifications)
}

/// Wired sensor without push delivery; no threads involved
pub fn quiet_rig() -> (Arc<LoopbackDevice>, RemoteSensor) {
    let config = SyncConfig::new();
    let device = Arc::new(LoopbackDevice::new(&config));
    let sensor = RemoteSensor::builder("Depth Sensor")
        .config(config)
        .filter(device.advertise(FilterType::Decimation, "Decimation Filter"))
        .filter(device.advertise(FilterType::Temporal, "Temporal Filter"))
        .transport(device.clone())
        .build()
        .unwrap();
    (device, sensor)
}

/// Values delivered to one option callback
pub struct Recorder {
    tx: Sender<OptionValue>,
    rx: Receiver<OptionValue>,
}

impl Recorder {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn callback(&self) -> impl Fn(OptionValue) + Send + Sync + 'static {
        let tx = self.tx.clone();
        move |value| {
            let _ = tx.send(value);
        }
    }

    /// Next value, failing the test after `WAIT`
    pub fn next(&self) -> OptionValue {
        match self.rx.recv_timeout(WAIT) {
            Ok(value) => value,
            Err(RecvTimeoutError::Timeout) => panic!("no value within {:?}", WAIT),
            Err(RecvTimeoutError::Disconnected) => panic!("recorder disconnected"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
