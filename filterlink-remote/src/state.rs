//! Remote Filter State
//!
//! The transport-facing picture of one filter: its structural fields (name,
//! type, declared options, stream type) and the option values last agreed
//! with the device.
//!
//! Structural fields are written once. Declaring any of them a second time
//! fails with `AlreadyInitialized`. Values change only through
//! [`replace_values`](RemoteFilterState::replace_values), which the proxy
//! calls after a successful set or an accepted device notification.

use filterlink_core::codec::utils::overlay;
use filterlink_core::options::{find_value, register_option_by_name, NamedValue, OptionDescriptor};
use filterlink_core::{FilterError, FilterResult, FilterType, OptionId, OptionValue};

use crate::messages::FilterProps;

/// Structural fields and cached values of one remote filter
#[derive(Debug, Clone, Default)]
pub struct RemoteFilterState {
    name: Option<String>,
    filter_type: Option<FilterType>,
    declarations: Option<Vec<OptionDescriptor>>,
    stream_type: Option<serde_json::Value>,
    current: Vec<NamedValue>,
}

impl RemoteFilterState {
    /// Empty state; every structural field still undeclared
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an advertisement, declaring every structural field once
    ///
    /// Advertised current values are checked against the declarations.
    pub fn from_props(props: FilterProps) -> FilterResult<Self> {
        let mut state = Self::new();
        state.set_name(&props.name)?;
        state.set_filter_type(props.filter_type)?;
        state.declare_options(props.options)?;
        state.set_stream_type(props.stream_type)?;
        if !props.current_values.is_empty() {
            let merged = state.merged_with(&props.current_values)?;
            state.current = merged;
        }
        Ok(state)
    }

    pub fn from_json(json: &str) -> FilterResult<Self> {
        Self::from_props(FilterProps::from_json(json)?)
    }

    pub fn set_name(&mut self, name: &str) -> FilterResult<()> {
        if self.name.is_some() {
            return Err(self.already("name"));
        }
        self.name = Some(name.to_string());
        Ok(())
    }

    pub fn set_filter_type(&mut self, filter_type: FilterType) -> FilterResult<()> {
        if self.filter_type.is_some() {
            return Err(self.already("type"));
        }
        self.filter_type = Some(filter_type);
        Ok(())
    }

    /// Declare the advertised options; seeds the cache from their values
    pub fn declare_options(&mut self, declarations: Vec<OptionDescriptor>) -> FilterResult<()> {
        if self.declarations.is_some() {
            return Err(self.already("options"));
        }
        self.current = declarations.iter().map(OptionDescriptor::named_value).collect();
        self.declarations = Some(declarations);
        Ok(())
    }

    pub fn set_stream_type(&mut self, stream_type: serde_json::Value) -> FilterResult<()> {
        if self.stream_type.is_some() {
            return Err(self.already("stream type"));
        }
        self.stream_type = Some(stream_type);
        Ok(())
    }

    fn already(&self, what: &'static str) -> FilterError {
        FilterError::AlreadyInitialized {
            filter: self.name.clone().unwrap_or_default(),
            what,
        }
    }

    /// Name, type and options all declared
    pub fn is_declared(&self) -> bool {
        self.name.is_some() && self.filter_type.is_some() && self.declarations.is_some()
    }

    pub fn name(&self) -> FilterResult<&str> {
        self.name
            .as_deref()
            .ok_or_else(|| FilterError::NotPopulated(String::new()))
    }

    pub fn filter_type(&self) -> FilterResult<FilterType> {
        self.filter_type
            .ok_or_else(|| FilterError::NotPopulated(self.name.clone().unwrap_or_default()))
    }

    /// Declared options, in advertisement order
    pub fn declarations(&self) -> &[OptionDescriptor] {
        self.declarations.as_deref().unwrap_or(&[])
    }

    pub fn declaration(&self, name: &str) -> Option<&OptionDescriptor> {
        self.declarations().iter().find(|d| d.name == name)
    }

    pub fn stream_type(&self) -> &serde_json::Value {
        self.stream_type.as_ref().unwrap_or(&serde_json::Value::Null)
    }

    /// Cached values, in declaration order
    pub fn current_values(&self) -> &[NamedValue] {
        &self.current
    }

    pub fn value(&self, name: &str) -> Option<OptionValue> {
        find_value(&self.current, name).copied()
    }

    /// Cached values with `updates` laid over them
    ///
    /// Each update must name a declared option and pass its declared kind
    /// and range. The state itself is not modified.
    pub fn merged_with(&self, updates: &[NamedValue]) -> FilterResult<Vec<NamedValue>> {
        let filter = self.filter_type()?;
        let mut merged = self.current.clone();
        for update in updates {
            let declaration =
                self.declaration(&update.name)
                    .ok_or_else(|| FilterError::UnknownOption {
                        filter,
                        name: update.name.clone(),
                    })?;
            let value = declaration.check(update.value)?;
            overlay(filter, &mut merged, &update.name, value)?;
        }
        Ok(merged)
    }

    /// Replace the cache; returns the ids whose value changed
    pub fn replace_values(&mut self, values: Vec<NamedValue>) -> Vec<(OptionId, OptionValue)> {
        let changed = values
            .iter()
            .filter(|next| find_value(&self.current, &next.name) != Some(&next.value))
            .map(|next| (register_option_by_name(&next.name), next.value))
            .collect();
        self.current = values;
        changed
    }

    /// Advertisement form, with the cached values as current values
    pub fn to_props(&self) -> FilterResult<FilterProps> {
        Ok(FilterProps {
            name: self.name()?.to_string(),
            filter_type: self.filter_type()?,
            options: self.declarations().to_vec(),
            stream_type: self.stream_type().clone(),
            current_values: self.current.clone(),
        })
    }

    pub fn to_json(&self) -> FilterResult<String> {
        Ok(self.to_props()?.to_json()?)
    }
}
