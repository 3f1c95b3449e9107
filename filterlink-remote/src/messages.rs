//! JSON messages exchanged with the device
//!
//! ## Control topic
//!
//! ```json
//! {"command": "set_options", "filter": "Temporal Filter", "type": "temporal",
//!  "options": [{"name": "Toggle", "value": 1}, {"name": "Alpha", "value": 0.4},
//!              {"name": "Delta", "value": 20}, {"name": "Persistency", "value": 3}]}
//! {"command": "get_options", "filter": "Temporal Filter", "type": "temporal"}
//! ```
//!
//! A `set_options` always carries the complete option set. A `get_options`
//! is answered with an [`OptionsReply`].
//!
//! ## Notification topic
//!
//! ```json
//! {"filter": "Temporal Filter", "options": [{"name": "Alpha", "value": 0.7}]}
//! ```
//!
//! Notifications may name any subset of the filter's options.
//!
//! ## Filter advertisement
//!
//! A device describes each filter as [`FilterProps`]: the declared options
//! with their ranges, the current values, and an opaque `stream_type`.

use filterlink_core::options::{NamedValue, OptionDescriptor};
use filterlink_core::FilterType;
use serde::{Deserialize, Serialize};

use crate::TransportError;

/// Request on the control topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ControlRequest {
    /// Replace the filter's options with a complete set
    SetOptions {
        filter: String,
        #[serde(rename = "type")]
        filter_type: FilterType,
        options: Vec<NamedValue>,
    },
    /// Ask for the filter's current options
    GetOptions {
        filter: String,
        #[serde(rename = "type")]
        filter_type: FilterType,
    },
}

impl ControlRequest {
    /// Name of the addressed filter
    pub fn filter(&self) -> &str {
        match self {
            ControlRequest::SetOptions { filter, .. } | ControlRequest::GetOptions { filter, .. } => {
                filter
            }
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TransportError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransportError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Device answer to `get_options`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionsReply {
    pub filter: String,
    pub options: Vec<NamedValue>,
}

impl OptionsReply {
    pub fn to_bytes(&self) -> Result<Vec<u8>, TransportError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransportError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Device-originated change of some options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterNotification {
    pub filter: String,
    pub options: Vec<NamedValue>,
}

impl FilterNotification {
    pub fn to_bytes(&self) -> Result<Vec<u8>, TransportError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransportError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// A filter as the device advertises it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterProps {
    pub name: String,
    #[serde(rename = "type")]
    pub filter_type: FilterType,
    pub options: Vec<OptionDescriptor>,
    /// Carried verbatim
    #[serde(default)]
    pub stream_type: serde_json::Value,
    #[serde(default)]
    pub current_values: Vec<NamedValue>,
}

impl FilterProps {
    pub fn from_json(json: &str) -> Result<Self, TransportError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, TransportError> {
        Ok(serde_json::to_string(self)?)
    }
}
