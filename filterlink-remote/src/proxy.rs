//! Remote Filter Proxy
//!
//! ## Read-Modify-Write
//!
//! The device only accepts complete options objects, so a single changed
//! option is never sent alone:
//!
//! ```text
//! 1. snapshot the cached option set          (state lock)
//! 2. overlay the changed field
//! 3. validate the merged set                 declared ranges + codec rules
//! 4. send set_options with the merged set    (no lock held)
//! 5. store the merged set in the cache       (state lock)
//! ```
//!
//! A failure at 3 or 4 leaves every cached field at its prior value. Sets
//! are serialized so two concurrent sets never merge into the same
//! snapshot.
//!
//! The transport may be wired after construction. Using an unwired proxy
//! fails with `NotWired` at the first set or refresh.

use core::marker::PhantomData;
use std::sync::{Arc, Mutex, RwLock};

use filterlink_core::codec::ParameterCodec;
use filterlink_core::options::NamedValue;
use filterlink_core::{FilterError, FilterResult, OptionId, OptionValue};
use log::{debug, warn};

use crate::messages::{ControlRequest, OptionsReply};
use crate::state::RemoteFilterState;
use crate::FilterTransport;

/// Bridges option models of one filter to the device
pub struct RemoteFilterProxy<C: ParameterCodec> {
    name: String,
    control_topic: String,
    state: Mutex<RemoteFilterState>,
    set_lock: Mutex<()>,
    transport: RwLock<Option<Arc<dyn FilterTransport>>>,
    _codec: PhantomData<fn() -> C>,
}

impl<C: ParameterCodec> RemoteFilterProxy<C> {
    /// Take ownership of a declared state
    ///
    /// The state must be declared with this codec's filter type, and its
    /// cached values must form a valid complete set.
    pub fn new(state: RemoteFilterState, control_topic: impl Into<String>) -> FilterResult<Self> {
        let filter_type = state.filter_type()?;
        if filter_type != C::FILTER_TYPE {
            return Err(FilterError::WrongFilterType {
                expected: C::FILTER_TYPE,
                actual: filter_type,
            });
        }
        C::from_options(state.current_values())?;
        Ok(Self {
            name: state.name()?.to_string(),
            control_topic: control_topic.into(),
            state: Mutex::new(state),
            set_lock: Mutex::new(()),
            transport: RwLock::new(None),
            _codec: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach the transport; replaces any previous one
    pub fn wire(&self, transport: Arc<dyn FilterTransport>) -> FilterResult<()> {
        *self.transport.write()? = Some(transport);
        Ok(())
    }

    pub fn is_wired(&self) -> bool {
        self.transport.read().map(|t| t.is_some()).unwrap_or(false)
    }

    fn transport(&self) -> FilterResult<Arc<dyn FilterTransport>> {
        self.transport
            .read()?
            .clone()
            .ok_or_else(|| FilterError::NotWired(self.name.clone()))
    }

    /// Cached value of one option
    pub fn value(&self, name: &str) -> FilterResult<OptionValue> {
        let filter = C::FILTER_TYPE;
        self.state
            .lock()?
            .value(name)
            .ok_or_else(|| FilterError::UnknownOption {
                filter,
                name: name.to_string(),
            })
    }

    /// Cached values as typed parameters
    pub fn params(&self) -> FilterResult<C::Params> {
        C::from_options(self.state.lock()?.current_values())
    }

    /// Run `read` against the state under its lock
    pub fn with_state<T>(&self, read: impl FnOnce(&RemoteFilterState) -> T) -> FilterResult<T> {
        let state = self.state.lock()?;
        Ok(read(&state))
    }

    /// Set one option through read-modify-write
    pub fn set_option(&self, name: &str, value: OptionValue) -> FilterResult<()> {
        self.commit(vec![NamedValue::new(name, value)])
    }

    /// Replace every option with a complete parameter set
    pub fn apply(&self, params: &C::Params) -> FilterResult<()> {
        if let Err(e) = C::validate(params) {
            warn!("{}: rejected parameters: {}", self.name, e);
            return Err(e);
        }
        self.commit(C::to_options(params))
    }

    /// Merge, validate, transmit, then cache
    ///
    /// Device pushes applied while the request is in flight are kept: only
    /// the fields named in `updates` are laid over the cache afterwards.
    fn commit(&self, updates: Vec<NamedValue>) -> FilterResult<()> {
        let _serial = self.set_lock.lock()?;
        let merged = self
            .state
            .lock()?
            .merged_with(&updates)
            .and_then(|merged| C::from_options(&merged).map(|_| merged));
        let merged = match merged {
            Ok(merged) => merged,
            Err(e) => {
                warn!("{}: rejected options update: {}", self.name, e);
                return Err(e);
            }
        };
        let transport = self.transport()?;
        let payload = ControlRequest::SetOptions {
            filter: self.name.clone(),
            filter_type: C::FILTER_TYPE,
            options: merged.clone(),
        }
        .to_bytes()?;
        transport.send(&self.control_topic, &payload)?;
        debug!(
            "{}: sent {} bytes to {}",
            self.name,
            payload.len(),
            self.control_topic
        );
        let mut state = self.state.lock()?;
        let next = state
            .merged_with(&updates)
            .and_then(|next| C::from_options(&next).map(|_| next))
            .unwrap_or(merged);
        state.replace_values(next);
        Ok(())
    }

    /// Re-read every option from the device
    ///
    /// Returns the ids whose cached value changed.
    pub fn refresh(&self) -> FilterResult<Vec<(OptionId, OptionValue)>> {
        let transport = self.transport()?;
        let request = ControlRequest::GetOptions {
            filter: self.name.clone(),
            filter_type: C::FILTER_TYPE,
        };
        let reply = transport.query(&self.control_topic, &request.to_bytes()?)?;
        let reply = OptionsReply::from_bytes(&reply)?;
        if reply.filter != self.name {
            return Err(FilterError::Transport(format!(
                "reply for '{}' received by '{}'",
                reply.filter, self.name
            )));
        }
        let _serial = self.set_lock.lock()?;
        let mut state = self.state.lock()?;
        let merged = state.merged_with(&reply.options)?;
        C::from_options(&merged)?;
        Ok(state.replace_values(merged))
    }

    /// Fold a device-originated change into the cache
    ///
    /// The merged set must still be valid; otherwise the cache is kept and
    /// the notification is refused.
    pub fn apply_notification(
        &self,
        options: &[NamedValue],
    ) -> FilterResult<Vec<(OptionId, OptionValue)>> {
        let mut state = self.state.lock()?;
        let merged = state.merged_with(options)?;
        C::from_options(&merged)?;
        Ok(state.replace_values(merged))
    }
}
