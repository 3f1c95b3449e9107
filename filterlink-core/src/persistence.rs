//! Saving and restoring filter settings
//!
//! Settings are scalar values under flat keys:
//!
//! ```text
//! <full filter name>.<option name>   every option except the enable flag
//! <full filter name>.enabled         the enable flag
//! ```
//!
//! Restore is deliberately forgiving. A stored value outside the option's
//! current range, or one the filter refuses, is skipped and the option keeps
//! its device default. Configs written by other versions load without error.

use std::collections::BTreeMap;

use crate::constants::ENABLED_SETTING_SUFFIX;
use crate::errors::FilterResult;
use crate::filter::EmbeddedFilter;
use crate::options::{OptionId, OptionValue};

/// Key/value store the settings live in
pub trait SettingsStore {
    /// Stored value under `key`
    fn get(&self, key: &str) -> Option<OptionValue>;
    /// Store `value` under `key`, replacing any previous one
    fn set(&mut self, key: &str, value: OptionValue);
}

/// In-memory store, ordered by key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySettings {
    values: BTreeMap<String, OptionValue>,
}

impl MemorySettings {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored settings
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<OptionValue> {
        self.values.get(key).copied()
    }

    fn set(&mut self, key: &str, value: OptionValue) {
        self.values.insert(key.to_string(), value);
    }
}

/// Key of one option's setting
pub fn setting_key(full_name: &str, option_name: &str) -> String {
    format!("{}.{}", full_name, option_name)
}

/// Key of a filter's enable flag
pub fn enabled_key(full_name: &str) -> String {
    setting_key(full_name, ENABLED_SETTING_SUFFIX)
}

/// Write every option except the enable flag, then the flag itself
///
/// Returns the number of option values written, not counting the flag.
pub fn save_filter_settings(
    full_name: &str,
    filter: &dyn EmbeddedFilter,
    store: &mut dyn SettingsStore,
    enabled: bool,
) -> FilterResult<usize> {
    let mut written = 0;
    for id in filter.supported_options() {
        if id == OptionId::ENABLED {
            continue;
        }
        let option = filter.option(id)?;
        store.set(&setting_key(full_name, option.name()), option.query()?);
        written += 1;
    }
    store.set(&enabled_key(full_name), OptionValue::from(enabled));
    Ok(written)
}

/// Apply stored values that are in range; return the stored enable flag
///
/// Values out of range, of the wrong kind, or refused by the filter are
/// skipped. Returns `default_enabled` when no flag was stored.
pub fn restore_filter_settings(
    full_name: &str,
    filter: &dyn EmbeddedFilter,
    store: &dyn SettingsStore,
    default_enabled: bool,
) -> bool {
    for id in filter.supported_options() {
        if id == OptionId::ENABLED {
            continue;
        }
        let Ok(option) = filter.option(id) else {
            continue;
        };
        let key = setting_key(full_name, option.name());
        let Some(value) = store.get(&key) else {
            continue;
        };
        if !option.range().contains(value.as_f64()) {
            log_debug!("Skipping {} = {}: outside {:?}", key, value, option.range());
            continue;
        }
        if option.query().map(|current| current == value).unwrap_or(false) {
            continue;
        }
        if let Err(_e) = option.set(value) {
            log_debug!("Skipping {} = {}: {}", key, value, _e);
        }
    }
    store
        .get(&enabled_key(full_name))
        .map(|flag| flag.as_f64() != 0.0)
        .unwrap_or(default_enabled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::TemporalControl;
    use crate::local::LocalTemporalFilter;

    const FULL: &str = "Depth Sensor.Temporal Filter";

    #[test]
    fn save_writes_options_and_flag() {
        let filter = LocalTemporalFilter::new("Temporal Filter");
        let mut store = MemorySettings::new();
        let written = save_filter_settings(FULL, &filter, &mut store, true).unwrap();
        assert_eq!(written, 3);
        assert_eq!(
            store.keys().collect::<Vec<_>>(),
            vec![
                "Depth Sensor.Temporal Filter.Alpha",
                "Depth Sensor.Temporal Filter.Delta",
                "Depth Sensor.Temporal Filter.Persistency",
                "Depth Sensor.Temporal Filter.enabled",
            ]
        );
        assert_eq!(store.get(&enabled_key(FULL)), Some(OptionValue::Int(1)));
    }

    #[test]
    fn restore_skips_out_of_range_values() {
        let filter = LocalTemporalFilter::new("Temporal Filter");
        let mut store = MemorySettings::new();
        store.set(&setting_key(FULL, "Alpha"), OptionValue::Float(2.0));
        store.set(&setting_key(FULL, "Delta"), OptionValue::Int(60));
        store.set(&setting_key(FULL, "Persistency"), OptionValue::Int(42));

        let enabled = restore_filter_settings(FULL, &filter, &store, false);

        assert!(!enabled);
        assert_eq!(filter.alpha().unwrap(), 0.4);
        assert_eq!(filter.delta().unwrap(), 60);
        assert_eq!(filter.persistency().unwrap(), 3);
    }

    #[test]
    fn restore_returns_stored_flag() {
        let filter = LocalTemporalFilter::new("Temporal Filter");
        let mut store = MemorySettings::new();
        store.set(&enabled_key(FULL), OptionValue::Int(1));
        assert!(restore_filter_settings(FULL, &filter, &store, false));
    }

    #[test]
    fn round_trip_through_store() {
        let source = LocalTemporalFilter::new("Temporal Filter");
        source.set_alpha(0.8).unwrap();
        source.set_persistency(5).unwrap();
        let mut store = MemorySettings::new();
        save_filter_settings(FULL, &source, &mut store, false).unwrap();

        let target = LocalTemporalFilter::new("Temporal Filter");
        restore_filter_settings(FULL, &target, &store, true);
        assert_eq!(target.alpha().unwrap(), 0.8);
        assert_eq!(target.persistency().unwrap(), 5);
    }
}
