//! In-process device
//!
//! [`LoopbackDevice`] plays the device side of the protocol without a
//! network: it keeps each filter's options, validates `set_options` the way
//! firmware would, answers `get_options`, and can push device-originated
//! changes through a [`NotificationSender`].
//!
//! Used by the demo and the tests. Failure knobs (`set_connected`,
//! `reject_updates`) let callers exercise the error paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use filterlink_core::codec::{self, utils::overlay};
use filterlink_core::options::{NamedValue, OptionDescriptor};
use filterlink_core::FilterType;
use log::debug;

use crate::config::SyncConfig;
use crate::delivery::NotificationSender;
use crate::messages::{ControlRequest, FilterNotification, FilterProps, OptionsReply};
use crate::{ConnectionStats, FilterTransport, TransportError};

struct DeviceFilter {
    filter_type: FilterType,
    values: Vec<NamedValue>,
}

/// Simulated device speaking the filter protocol
pub struct LoopbackDevice {
    control_topic: String,
    notification_topic: String,
    filters: Mutex<BTreeMap<String, DeviceFilter>>,
    connected: AtomicBool,
    rejection: Mutex<Option<String>>,
    requests: Mutex<Vec<ControlRequest>>,
    stats: Mutex<ConnectionStats>,
    notifications: Mutex<Option<NotificationSender>>,
}

impl LoopbackDevice {
    /// Device listening on the topics of `config`
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            control_topic: config.control_topic(),
            notification_topic: config.notification_topic(),
            filters: Mutex::new(BTreeMap::new()),
            connected: AtomicBool::new(true),
            rejection: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            stats: Mutex::new(ConnectionStats::default()),
            notifications: Mutex::new(None),
        }
    }

    /// Install a filter at its defaults and return its advertisement
    pub fn advertise(&self, filter_type: FilterType, name: &str) -> FilterProps {
        let options = codec::declarations(filter_type);
        let values: Vec<NamedValue> = options.iter().map(OptionDescriptor::named_value).collect();
        if let Ok(mut filters) = self.filters.lock() {
            filters.insert(
                name.to_string(),
                DeviceFilter {
                    filter_type,
                    values: values.clone(),
                },
            );
        }
        FilterProps {
            name: name.to_string(),
            filter_type,
            options,
            stream_type: serde_json::json!({ "stream": "depth", "index": 0 }),
            current_values: values,
        }
    }

    /// Route device pushes into `sender`
    pub fn connect_notifications(&self, sender: NotificationSender) {
        if let Ok(mut slot) = self.notifications.lock() {
            *slot = Some(sender);
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Refuse every `set_options` with `reason` until cleared with `None`
    pub fn reject_updates(&self, reason: Option<&str>) {
        if let Ok(mut rejection) = self.rejection.lock() {
            *rejection = reason.map(str::to_string);
        }
    }

    /// Options the device currently holds for a filter
    pub fn values(&self, filter: &str) -> Option<Vec<NamedValue>> {
        let filters = self.filters.lock().ok()?;
        filters.get(filter).map(|f| f.values.clone())
    }

    /// Every control request received, oldest first
    pub fn requests(&self) -> Vec<ControlRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Change options on the device side and notify the host
    ///
    /// `options` may name any subset of the filter's options.
    pub fn push(&self, filter: &str, options: Vec<NamedValue>) -> Result<(), TransportError> {
        {
            let mut filters = self
                .filters
                .lock()
                .map_err(|_| TransportError::Protocol("device state poisoned".into()))?;
            let entry = filters
                .get_mut(filter)
                .ok_or_else(|| TransportError::Protocol(format!("no filter '{}'", filter)))?;
            let mut merged = entry.values.clone();
            for option in &options {
                overlay(entry.filter_type, &mut merged, &option.name, option.value)
                    .map_err(|e| TransportError::Protocol(e.to_string()))?;
            }
            codec::from_options(entry.filter_type, &merged)
                .map_err(|e| TransportError::Protocol(e.to_string()))?;
            entry.values = merged;
        }
        let sender = self
            .notifications
            .lock()
            .map_err(|_| TransportError::NotConnected)?
            .clone()
            .ok_or(TransportError::NotConnected)?;
        let payload = FilterNotification {
            filter: filter.to_string(),
            options,
        }
        .to_bytes()?;
        if let Ok(mut stats) = self.stats.lock() {
            stats.notifications += 1;
        }
        sender.deliver(&self.notification_topic, &payload)
    }

    fn check_link(&self, topic: &str) -> Result<(), TransportError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        if topic != self.control_topic {
            return Err(TransportError::Protocol(format!("unexpected topic {}", topic)));
        }
        Ok(())
    }

    fn receive(&self, topic: &str, payload: &[u8]) -> Result<ControlRequest, TransportError> {
        self.check_link(topic)?;
        let request = ControlRequest::from_bytes(payload)?;
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        Ok(request)
    }

    fn handle_set(
        &self,
        filter: &str,
        filter_type: FilterType,
        options: Vec<NamedValue>,
    ) -> Result<(), TransportError> {
        if let Some(reason) = self.rejection.lock().ok().and_then(|r| r.clone()) {
            return Err(TransportError::Rejected(reason));
        }
        codec::from_options(filter_type, &options)
            .map_err(|e| TransportError::Rejected(e.to_string()))?;
        let mut filters = self
            .filters
            .lock()
            .map_err(|_| TransportError::Protocol("device state poisoned".into()))?;
        match filters.get_mut(filter) {
            Some(entry) if entry.filter_type == filter_type => {
                entry.values = options;
                debug!("loopback: {} updated", filter);
                Ok(())
            }
            _ => Err(TransportError::Rejected(format!(
                "no {} filter named '{}'",
                filter_type, filter
            ))),
        }
    }

    fn record(&self, bytes: usize, result: &Result<(), TransportError>) {
        if let Ok(mut stats) = self.stats.lock() {
            match result {
                Ok(()) => stats.record_sent(bytes),
                Err(e) => stats.record_failure(e),
            }
        }
    }
}

impl FilterTransport for LoopbackDevice {
    fn send(&self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        let result = self.receive(topic, payload).and_then(|request| match request {
            ControlRequest::SetOptions {
                filter,
                filter_type,
                options,
            } => self.handle_set(&filter, filter_type, options),
            ControlRequest::GetOptions { .. } => Err(TransportError::Protocol(
                "get_options must be sent as a query".into(),
            )),
        });
        self.record(payload.len(), &result);
        result
    }

    fn query(&self, topic: &str, payload: &[u8]) -> Result<Vec<u8>, TransportError> {
        let request = self.receive(topic, payload)?;
        let ControlRequest::GetOptions { filter, .. } = request else {
            return Err(TransportError::Protocol("query expects get_options".into()));
        };
        let options = self
            .values(&filter)
            .ok_or_else(|| TransportError::Rejected(format!("no filter '{}'", filter)))?;
        let reply = OptionsReply { filter, options }.to_bytes()?;
        self.record(payload.len(), &Ok(()));
        Ok(reply)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn stats(&self) -> ConnectionStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filterlink_core::OptionValue;

    fn device() -> LoopbackDevice {
        let device = LoopbackDevice::new(&SyncConfig::new());
        device.advertise(FilterType::Temporal, "Temporal Filter");
        device
    }

    fn set(options: Vec<NamedValue>) -> Vec<u8> {
        ControlRequest::SetOptions {
            filter: "Temporal Filter".into(),
            filter_type: FilterType::Temporal,
            options,
        }
        .to_bytes()
        .unwrap()
    }

    fn complete(alpha: f64) -> Vec<NamedValue> {
        vec![
            NamedValue::new("Toggle", 1),
            NamedValue::new("Alpha", alpha),
            NamedValue::new("Delta", 20),
            NamedValue::new("Persistency", 3),
        ]
    }

    #[test]
    fn accepts_complete_valid_sets() {
        let device = device();
        device.send("rt/device/control", &set(complete(0.6))).unwrap();
        let values = device.values("Temporal Filter").unwrap();
        assert_eq!(values[1].value, OptionValue::Float(0.6));
        assert_eq!(device.stats().messages_sent, 1);
    }

    #[test]
    fn refuses_partial_and_invalid_sets() {
        let device = device();
        let partial = set(vec![NamedValue::new("Alpha", 0.6)]);
        assert!(matches!(
            device.send("rt/device/control", &partial),
            Err(TransportError::Rejected(_))
        ));
        assert!(device.send("rt/device/control", &set(complete(3.0))).is_err());
        assert_eq!(device.stats().messages_failed, 2);
    }

    #[test]
    fn link_failures() {
        let device = device();
        assert!(matches!(
            device.send("rt/other/control", &set(complete(0.5))),
            Err(TransportError::Protocol(_))
        ));
        device.set_connected(false);
        assert!(matches!(
            device.send("rt/device/control", &set(complete(0.5))),
            Err(TransportError::NotConnected)
        ));
    }

    #[test]
    fn push_without_listener_is_not_connected() {
        let device = device();
        assert!(matches!(
            device.push("Temporal Filter", vec![NamedValue::new("Delta", 40)]),
            Err(TransportError::NotConnected)
        ));
        // The device itself still changed.
        assert_eq!(
            device.values("Temporal Filter").unwrap()[2].value,
            OptionValue::Int(40)
        );
    }
}
