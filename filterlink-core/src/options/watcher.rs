//! Options Watcher - subscriptions to option-changed notifications
//!
//! ## Overview
//!
//! The watcher decouples whoever learns about new option values (the remote
//! proxy, fed by the transport) from whoever cares (UI models, persistence,
//! tests). Subscribers register per option id and receive only changes to
//! that id.
//!
//! ## Ordering
//!
//! - For one option id, callbacks run in the order they were registered.
//! - Across ids within one event, order is unspecified.
//!
//! ## Teardown
//!
//! A filter may be destroyed while the transport thread is dispatching into
//! its watcher. The "destructing" flag lives inside the watcher's lock, and
//! dispatch holds that lock across both the flag check and the callbacks.
//! Once `begin_destruction` returns, no callback registered before it will
//! ever run again.
//!
//! Callbacks run with the watcher locked: a callback must not subscribe to,
//! or drop a subscription of, the same watcher.
//!
//! ```rust
//! use filterlink_core::options::{OptionId, OptionValue, OptionsWatcher};
//! use std::sync::{Arc, Mutex};
//!
//! let watcher = OptionsWatcher::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! let _sub = watcher
//!     .subscribe(OptionId::SMOOTH_ALPHA, move |_, v| sink.lock().unwrap().push(v))
//!     .unwrap();
//!
//! watcher.dispatch(&[(OptionId::SMOOTH_ALPHA, OptionValue::Float(0.7))]);
//! assert_eq!(*seen.lock().unwrap(), vec![OptionValue::Float(0.7)]);
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};

use crossbeam_channel::{Receiver, Sender};

use super::id::OptionId;
use super::value::OptionValue;
use crate::errors::{FilterError, FilterResult};

type Callback = Arc<dyn Fn(OptionId, OptionValue) + Send + Sync>;

#[derive(Default)]
struct WatcherState {
    destructing: bool,
    next_token: u64,
    subscribers: BTreeMap<OptionId, Vec<(u64, Callback)>>,
}

/// Subscription registry keyed by option id
#[derive(Default)]
pub struct OptionsWatcher {
    state: Mutex<WatcherState>,
}

impl OptionsWatcher {
    /// Create a watcher; subscriptions hold weak references to it
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a callback for changes to one option
    ///
    /// Fails once destruction has begun.
    pub fn subscribe<F>(self: &Arc<Self>, id: OptionId, callback: F) -> FilterResult<Subscription>
    where
        F: Fn(OptionId, OptionValue) + Send + Sync + 'static,
    {
        let mut state = self.state.lock()?;
        if state.destructing {
            return Err(FilterError::Destroyed(format!("watcher of {}", id)));
        }
        let token = state.next_token;
        state.next_token += 1;
        state
            .subscribers
            .entry(id)
            .or_default()
            .push((token, Arc::new(callback)));
        Ok(Subscription {
            watcher: Arc::downgrade(self),
            id,
            token,
            active: true,
        })
    }

    /// Register a channel that receives every new value of one option
    ///
    /// Values queue unbounded until read; dropping the returned watch ends
    /// the subscription.
    pub fn watch(self: &Arc<Self>, id: OptionId) -> FilterResult<OptionWatch> {
        let (tx, rx): (Sender<OptionValue>, Receiver<OptionValue>) = crossbeam_channel::unbounded();
        let subscription = self.subscribe(id, move |_, value| {
            // Receiver gone means the watch is being dropped; nothing to do.
            let _ = tx.send(value);
        })?;
        Ok(OptionWatch {
            receiver: rx,
            _subscription: subscription,
        })
    }

    /// Deliver changed values to the subscribers of each named id
    ///
    /// Returns how many callbacks ran. Nothing runs once destruction began.
    pub fn dispatch(&self, changes: &[(OptionId, OptionValue)]) -> usize {
        let state = match self.state.lock() {
            Ok(state) => state,
            Err(_) => return 0,
        };
        if state.destructing {
            return 0;
        }
        let mut delivered = 0;
        for (id, value) in changes {
            if let Some(subscribers) = state.subscribers.get(id) {
                for (_, callback) in subscribers {
                    callback(*id, *value);
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Stop all future dispatch and drop every subscriber
    ///
    /// Waits for an in-flight dispatch to finish first.
    pub fn begin_destruction(&self) {
        let retired = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.destructing = true;
            std::mem::take(&mut state.subscribers)
        };
        // Callbacks may own subscriptions to this watcher; drop them unlocked.
        drop(retired);
    }

    /// Has destruction begun?
    pub fn is_destructing(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.destructing)
            .unwrap_or(true)
    }

    /// Number of live subscribers for an id
    pub fn subscriber_count(&self, id: OptionId) -> usize {
        self.state
            .lock()
            .map(|state| state.subscribers.get(&id).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn unsubscribe(&self, id: OptionId, token: u64) {
        let removed = {
            let mut state = match self.state.lock() {
                Ok(state) => state,
                Err(_) => return,
            };
            let Some(subscribers) = state.subscribers.get_mut(&id) else {
                return;
            };
            let removed = subscribers
                .iter()
                .position(|(t, _)| *t == token)
                .map(|pos| subscribers.remove(pos));
            if subscribers.is_empty() {
                state.subscribers.remove(&id);
            }
            removed
        };
        drop(removed);
    }
}

/// Handle for one registered callback; unsubscribes on drop
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    watcher: Weak<OptionsWatcher>,
    id: OptionId,
    token: u64,
    active: bool,
}

impl Subscription {
    /// Option this subscription listens to
    pub fn option_id(&self) -> OptionId {
        self.id
    }

    /// Explicitly cancel
    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(watcher) = self.watcher.upgrade() {
            watcher.unsubscribe(self.id, self.token);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("token", &self.token)
            .field("active", &self.active)
            .finish()
    }
}

/// Channel form of a subscription
pub struct OptionWatch {
    receiver: Receiver<OptionValue>,
    _subscription: Subscription,
}

impl OptionWatch {
    /// Receiver yielding each new value in delivery order
    pub fn receiver(&self) -> &Receiver<OptionValue> {
        &self.receiver
    }

    /// Next queued value, if any
    pub fn try_next(&self) -> Option<OptionValue> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn(OptionId, OptionValue) + Send + Sync + 'static) {
        let hits = Arc::new(AtomicUsize::new(0));
        let sink = hits.clone();
        (hits, move |_, _| {
            sink.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn dispatch_reaches_only_named_ids() {
        let watcher = OptionsWatcher::new();
        let (alpha_hits, alpha_cb) = counter();
        let (delta_hits, delta_cb) = counter();
        let _a = watcher.subscribe(OptionId::SMOOTH_ALPHA, alpha_cb).unwrap();
        let _d = watcher.subscribe(OptionId::SMOOTH_DELTA, delta_cb).unwrap();

        watcher.dispatch(&[(OptionId::SMOOTH_ALPHA, OptionValue::Float(0.7))]);

        assert_eq!(alpha_hits.load(Ordering::SeqCst), 1);
        assert_eq!(delta_hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn same_id_dispatch_follows_registration_order() {
        let watcher = OptionsWatcher::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let subs: Vec<Subscription> = (0..4)
            .map(|i| {
                let order = order.clone();
                watcher
                    .subscribe(OptionId::ENABLED, move |_, _| order.lock().unwrap().push(i))
                    .unwrap()
            })
            .collect();

        watcher.dispatch(&[(OptionId::ENABLED, OptionValue::Int(1))]);

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
        drop(subs);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let watcher = OptionsWatcher::new();
        let (hits, cb) = counter();
        let sub = watcher.subscribe(OptionId::MAGNITUDE, cb).unwrap();
        assert_eq!(watcher.subscriber_count(OptionId::MAGNITUDE), 1);
        drop(sub);
        assert_eq!(watcher.subscriber_count(OptionId::MAGNITUDE), 0);
        watcher.dispatch(&[(OptionId::MAGNITUDE, OptionValue::Int(2))]);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn explicit_cancel_unsubscribes() {
        let watcher = OptionsWatcher::new();
        let (_, cb) = counter();
        let sub = watcher.subscribe(OptionId::MAGNITUDE, cb).unwrap();
        sub.cancel();
        assert_eq!(watcher.subscriber_count(OptionId::MAGNITUDE), 0);
    }

    #[test]
    fn no_dispatch_after_destruction_begins() {
        let watcher = OptionsWatcher::new();
        let (hits, cb) = counter();
        let _sub = watcher.subscribe(OptionId::SMOOTH_ALPHA, cb).unwrap();

        watcher.begin_destruction();
        for _ in 0..10 {
            assert_eq!(watcher.dispatch(&[(OptionId::SMOOTH_ALPHA, OptionValue::Float(0.1))]), 0);
        }

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(watcher.subscribe(OptionId::SMOOTH_ALPHA, |_, _| {}).is_err());
    }

    #[test]
    fn subscription_outliving_watcher_is_harmless() {
        let watcher = OptionsWatcher::new();
        let sub = watcher.subscribe(OptionId::ENABLED, |_, _| {}).unwrap();
        drop(watcher);
        drop(sub);
    }

    #[test]
    fn watch_channel_yields_values_in_order() {
        let watcher = OptionsWatcher::new();
        let watch = watcher.watch(OptionId::SMOOTH_DELTA).unwrap();
        watcher.dispatch(&[(OptionId::SMOOTH_DELTA, OptionValue::Int(30))]);
        watcher.dispatch(&[(OptionId::SMOOTH_DELTA, OptionValue::Int(40))]);
        assert_eq!(watch.try_next(), Some(OptionValue::Int(30)));
        assert_eq!(watch.try_next(), Some(OptionValue::Int(40)));
        assert_eq!(watch.try_next(), None);
        drop(watch);
        assert_eq!(watcher.subscriber_count(OptionId::SMOOTH_DELTA), 0);
    }
}
