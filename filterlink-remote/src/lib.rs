//! Options Synchronization with Remote Devices
//!
//! ## Overview
//!
//! The filters controlled by this crate run in device firmware. Host code
//! sees them through the filter contract of `filterlink-core`; this crate
//! keeps that view in sync with the device over a publish/subscribe
//! transport.
//!
//! ## Message Flow
//!
//! ```text
//!  OptionModel::set ──> RemoteFilterProxy ──(complete options set)──> <root>/control
//!                           │ read-modify-write
//!                           ▼
//!                     RemoteFilterState (cache)
//!                           ▲
//!  <root>/notification ──> NotificationLoop ──> RemoteFilter ──> OptionsWatcher
//! ```
//!
//! ### Outbound
//! - Every set is merged into the filter's full current option set before it
//!   is sent. The device only accepts complete options objects.
//! - Validation runs before anything is transmitted. A rejected set leaves
//!   the cache untouched.
//! - A device rejection surfaces to the caller as `FilterError::Transport`.
//!   Nothing is retried.
//!
//! ### Inbound
//! - The transport hands raw notifications to a [`NotificationSender`].
//! - One shared worker thread routes them to filters by topic and name.
//!   The thread starts with the first sensor that needs it and stops
//!   after the last one goes away.
//! - The channel is bounded. A full channel blocks the transport thread and
//!   order is preserved.
//!
//! ## Transports
//!
//! Anything implementing [`FilterTransport`] can carry the protocol. The
//! crate ships [`loopback::LoopbackDevice`], an in-process device used by
//! the demo and the tests.
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use filterlink_core::{EmbeddedFilter, FilterType};
//! use filterlink_core::sensor::GetEmbeddedFilters;
//! use filterlink_remote::loopback::LoopbackDevice;
//! use filterlink_remote::{RemoteSensor, SyncConfig};
//!
//! let config = SyncConfig::new();
//! let device = Arc::new(LoopbackDevice::new(&config));
//! let sensor = RemoteSensor::builder("Depth Sensor")
//!     .config(config)
//!     .filter(device.advertise(FilterType::Decimation, "Decimation Filter"))
//!     .transport(device.clone())
//!     .build()?;
//!
//! let decimation = sensor.embedded_filter(FilterType::Decimation)?;
//! decimation.enable(true)?;
//! assert_eq!(decimation.get()?.as_slice(), &[1, 2]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod delivery;
pub mod filter;
pub mod loopback;
pub mod messages;
pub mod proxy;
pub mod sensor;
pub mod state;

// Re-export common types
pub use config::{ConfigError, SyncConfig};
pub use delivery::{NotificationLoop, NotificationSender};
pub use filter::{DecimationFilter, RemoteFilter, TemporalFilter};
pub use messages::{ControlRequest, FilterNotification, FilterProps, OptionsReply};
pub use proxy::RemoteFilterProxy;
pub use sensor::{RemoteSensor, SensorError};
pub use state::RemoteFilterState;

use filterlink_core::{CapabilityRegistry, FilterError, FilterResult};
use thiserror::Error;

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Not connected")]
    NotConnected,

    #[error("Timeout")]
    Timeout,

    #[error("Device rejected update: {0}")]
    Rejected(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<TransportError> for FilterError {
    fn from(err: TransportError) -> Self {
        FilterError::Transport(err.to_string())
    }
}

/// Publish/subscribe transport to one device
///
/// Calls block until the device acknowledges or the transport gives up.
/// Timeouts are the transport's business.
pub trait FilterTransport: Send + Sync {
    /// Publish a control message
    fn send(&self, topic: &str, payload: &[u8]) -> Result<(), TransportError>;

    /// Publish a request and wait for the device's reply
    fn query(&self, topic: &str, payload: &[u8]) -> Result<Vec<u8>, TransportError>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Get connection statistics
    fn stats(&self) -> ConnectionStats;
}

/// Connection statistics common to all transports
#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    /// Total messages sent successfully
    pub messages_sent: u64,
    /// Total messages failed to send
    pub messages_failed: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Notifications pushed by the device
    pub notifications: u64,
    /// Last error message
    pub last_error: Option<String>,
}

impl ConnectionStats {
    /// Count one delivered message
    pub fn record_sent(&mut self, bytes: usize) {
        self.messages_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    /// Count one failed message
    pub fn record_failure(&mut self, err: &TransportError) {
        self.messages_failed += 1;
        self.last_error = Some(err.to_string());
    }
}

/// Register every capability this crate and the core know about
pub fn register_capabilities(registry: &CapabilityRegistry) -> FilterResult<()> {
    filterlink_core::local::register_capabilities(registry)?;
    filter::register_capabilities(registry)?;
    sensor::register_capabilities(registry)?;
    Ok(())
}

lazy_static::lazy_static! {
    /// Global capability registry with every known accessor loaded
    pub static ref GLOBAL_REGISTRY: CapabilityRegistry = loaded(CapabilityRegistry::new());
}

/// `registry` with every accessor registered; failures are logged, not raised
fn loaded(registry: CapabilityRegistry) -> CapabilityRegistry {
    if let Err(e) = register_capabilities(&registry) {
        log::error!("Capability registration failed: {}", e);
    }
    registry
}
