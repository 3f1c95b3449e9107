//! Notification Loop
//!
//! ## Overview
//!
//! Device-originated changes arrive on a thread the transport owns. They are
//! not applied there: the transport hands each raw notification to a
//! [`NotificationSender`], which queues it on a bounded channel. One worker
//! thread drains the channel and routes every notification to the filter
//! registered for its `(topic, filter name)`.
//!
//! ```text
//! transport thread ──deliver──> [bounded channel] ──> worker ──> RemoteFilter
//!                     blocks when full          FIFO      (Weak, may be gone)
//! ```
//!
//! ## Lifecycle
//!
//! The worker is shared and demand-driven. [`NotificationLoop::acquire`]
//! counts requesters; the first one starts the worker and the last
//! [`LoopHandle`] to drop signals it to stop. The stop signal travels on its
//! own channel, so releasing never waits on a full notification queue, even
//! from inside a notification callback. A restart joins the previous worker
//! before spawning the next, so at most one worker ever drains the channel.
//!
//! Routes hold filters weakly. A filter that is gone or being destroyed
//! simply drops the notification.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, select, Receiver, Sender};
use filterlink_core::options::NamedValue;
use filterlink_core::{FilterError, FilterResult};
use log::{debug, info, warn};

use crate::config::SyncConfig;
use crate::messages::FilterNotification;
use crate::TransportError;

/// Something a notification can be routed to
pub trait NotificationTarget: Send + Sync {
    /// Fold the named values in; returns how many callbacks ran
    fn deliver(&self, options: &[NamedValue]) -> FilterResult<usize>;
}

struct Envelope {
    topic: String,
    message: FilterNotification,
}

type RouteKey = (String, String);

struct Shared {
    routes: RwLock<HashMap<RouteKey, Vec<(u64, Weak<dyn NotificationTarget>)>>>,
    next_route: AtomicU64,
    running: AtomicBool,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl Shared {
    fn route(&self, topic: &str, message: FilterNotification) {
        let key = (topic.to_string(), message.filter.clone());
        let targets: Vec<Arc<dyn NotificationTarget>> = match self.routes.read() {
            Ok(routes) => routes
                .get(&key)
                .map(|entries| entries.iter().filter_map(|(_, t)| t.upgrade()).collect())
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        };
        if targets.is_empty() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("Dropping notification for unknown filter '{}' on {}", key.1, key.0);
            return;
        }
        for target in targets {
            match target.deliver(&message.options) {
                Ok(callbacks) => {
                    self.delivered.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        "{}: {} option(s) pushed, {} callback(s)",
                        key.1,
                        message.options.len(),
                        callbacks
                    );
                }
                Err(e) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!("Dropping notification for '{}': {}", key.1, e);
                }
            }
        }
    }
}

struct LoopControl {
    requesters: usize,
    worker: Option<JoinHandle<()>>,
    // Dropping this stops the current worker.
    stop: Option<Sender<()>>,
}

/// Shared, demand-started delivery of device notifications
pub struct NotificationLoop {
    shared: Arc<Shared>,
    sender: Sender<Envelope>,
    receiver: Receiver<Envelope>,
    control: Mutex<LoopControl>,
}

impl NotificationLoop {
    /// Loop whose channel buffers `capacity` notifications
    pub fn new(capacity: usize) -> Arc<Self> {
        let (sender, receiver) = bounded(capacity.max(1));
        Arc::new(Self {
            shared: Arc::new(Shared {
                routes: RwLock::new(HashMap::new()),
                next_route: AtomicU64::new(0),
                running: AtomicBool::new(false),
                delivered: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
            sender,
            receiver,
            control: Mutex::new(LoopControl {
                requesters: 0,
                worker: None,
                stop: None,
            }),
        })
    }

    pub fn from_config(config: &SyncConfig) -> Arc<Self> {
        Self::new(config.notification_capacity)
    }

    /// Register a requester, starting the worker if it is the first
    pub fn acquire(self: &Arc<Self>) -> FilterResult<LoopHandle> {
        let mut control = self.control.lock()?;
        if control.requesters == 0 {
            if let Some(previous) = control.worker.take() {
                join_worker(previous);
            }
            let receiver = self.receiver.clone();
            let shared = self.shared.clone();
            let (stop, stopped) = bounded(1);
            let worker = thread::Builder::new()
                .name("filterlink-notify".into())
                .spawn(move || run(receiver, stopped, shared))
                .map_err(|e| {
                    FilterError::Transport(format!("cannot start notification loop: {}", e))
                })?;
            control.worker = Some(worker);
            control.stop = Some(stop);
            self.shared.running.store(true, Ordering::Release);
            info!("Notification loop started");
        }
        control.requesters += 1;
        Ok(LoopHandle {
            owner: Arc::clone(self),
        })
    }

    fn release(&self) {
        let Ok(mut control) = self.control.lock() else {
            return;
        };
        control.requesters = control.requesters.saturating_sub(1);
        if control.requesters == 0 {
            if let Some(stop) = control.stop.take() {
                self.shared.running.store(false, Ordering::Release);
                drop(stop);
                info!("Notification loop stopping");
            }
        }
    }

    /// Worker started and not yet told to stop
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn requesters(&self) -> usize {
        self.control.lock().map(|c| c.requesters).unwrap_or(0)
    }

    /// Handle the transport pushes raw notifications through
    pub fn sender(&self) -> NotificationSender {
        NotificationSender {
            sender: self.sender.clone(),
            shared: self.shared.clone(),
        }
    }

    /// Route notifications for `filter` on `topic` to `target`
    pub fn route(
        &self,
        topic: &str,
        filter: &str,
        target: Weak<dyn NotificationTarget>,
    ) -> FilterResult<Route> {
        let key = (topic.to_string(), filter.to_string());
        let token = self.shared.next_route.fetch_add(1, Ordering::Relaxed);
        self.shared
            .routes
            .write()?
            .entry(key.clone())
            .or_default()
            .push((token, target));
        Ok(Route {
            shared: Arc::downgrade(&self.shared),
            key,
            token,
        })
    }

    /// Notifications handed to a filter
    pub fn delivered(&self) -> u64 {
        self.shared.delivered.load(Ordering::Relaxed)
    }

    /// Notifications refused or without a live route
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for NotificationLoop {
    fn drop(&mut self) {
        if let Ok(control) = self.control.get_mut() {
            if let Some(worker) = control.worker.take() {
                join_worker(worker);
            }
        }
    }
}

fn run(receiver: Receiver<Envelope>, stopped: Receiver<()>, shared: Arc<Shared>) {
    loop {
        select! {
            recv(receiver) -> envelope => match envelope {
                Ok(Envelope { topic, message }) => shared.route(&topic, message),
                Err(_) => break,
            },
            recv(stopped) -> _ => {
                // Whatever was queued before the stop is still delivered.
                for Envelope { topic, message } in receiver.try_iter() {
                    shared.route(&topic, message);
                }
                break;
            }
        }
    }
    debug!("Notification worker exited");
}

fn join_worker(worker: JoinHandle<()>) {
    // A worker cannot join itself.
    if worker.thread().id() != thread::current().id() && worker.join().is_err() {
        warn!("Notification worker panicked");
    }
}

/// Keeps the worker alive; the last one to drop stops it
#[must_use = "the notification loop stops when the handle is dropped"]
pub struct LoopHandle {
    owner: Arc<NotificationLoop>,
}

impl LoopHandle {
    pub fn notifications(&self) -> &Arc<NotificationLoop> {
        &self.owner
    }
}

impl Drop for LoopHandle {
    fn drop(&mut self) {
        self.owner.release();
    }
}

/// Registered route; unregisters on drop
#[must_use = "the route is removed when dropped"]
pub struct Route {
    shared: Weak<Shared>,
    key: RouteKey,
    token: u64,
}

impl Drop for Route {
    fn drop(&mut self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let Ok(mut routes) = shared.routes.write() else {
            return;
        };
        if let Some(entries) = routes.get_mut(&self.key) {
            entries.retain(|(token, _)| *token != self.token);
            if entries.is_empty() {
                routes.remove(&self.key);
            }
        }
    }
}

/// Transport-side entry point for inbound notifications
#[derive(Clone)]
pub struct NotificationSender {
    sender: Sender<Envelope>,
    shared: Arc<Shared>,
}

impl NotificationSender {
    /// Parse and queue a raw notification received on `topic`
    ///
    /// Blocks while the channel is full.
    pub fn deliver(&self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        let message = FilterNotification::from_bytes(payload)?;
        self.publish(topic, message)
    }

    /// Queue an already parsed notification
    pub fn publish(&self, topic: &str, message: FilterNotification) -> Result<(), TransportError> {
        if !self.shared.running.load(Ordering::Acquire) {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("Notification loop stopped; dropping update for '{}'", message.filter);
            return Err(TransportError::NotConnected);
        }
        self.sender
            .send(Envelope {
                topic: topic.to_string(),
                message,
            })
            .map_err(|_| TransportError::NotConnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use filterlink_core::OptionValue;
    use std::time::Duration;

    const TOPIC: &str = "rt/device/notification";

    struct Sink(Sender<Vec<NamedValue>>);

    impl NotificationTarget for Sink {
        fn deliver(&self, options: &[NamedValue]) -> FilterResult<usize> {
            let _ = self.0.send(options.to_vec());
            Ok(1)
        }
    }

    fn sink() -> (Arc<dyn NotificationTarget>, Receiver<Vec<NamedValue>>) {
        let (tx, rx) = unbounded();
        (Arc::new(Sink(tx)), rx)
    }

    fn alpha(value: f64) -> FilterNotification {
        FilterNotification {
            filter: "Temporal Filter".into(),
            options: vec![NamedValue::new("Alpha", value)],
        }
    }

    #[test]
    fn worker_follows_requester_count() {
        let notifications = NotificationLoop::new(4);
        assert!(!notifications.is_running());

        let first = notifications.acquire().unwrap();
        let second = notifications.acquire().unwrap();
        assert!(notifications.is_running());
        assert_eq!(notifications.requesters(), 2);

        drop(first);
        assert!(notifications.is_running());
        drop(second);
        assert!(!notifications.is_running());

        // Restart joins the stopped worker first.
        let _again = notifications.acquire().unwrap();
        assert!(notifications.is_running());
    }

    #[test]
    fn routes_by_topic_and_filter_name() {
        let notifications = NotificationLoop::new(4);
        let _handle = notifications.acquire().unwrap();
        let (target, rx) = sink();
        let _route = notifications
            .route(TOPIC, "Temporal Filter", Arc::downgrade(&target))
            .unwrap();

        notifications.sender().publish("rt/other/notification", alpha(0.1)).unwrap();
        notifications.sender().publish(TOPIC, alpha(0.7)).unwrap();

        let received = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(received, alpha(0.7).options);
        assert_eq!(notifications.dropped(), 1);
    }

    #[test]
    fn dropped_route_stops_delivery() {
        let notifications = NotificationLoop::new(4);
        let _handle = notifications.acquire().unwrap();
        let (target, rx) = sink();
        let route = notifications
            .route(TOPIC, "Temporal Filter", Arc::downgrade(&target))
            .unwrap();
        drop(route);

        notifications.sender().publish(TOPIC, alpha(0.7)).unwrap();
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn stopped_loop_refuses_notifications() {
        let notifications = NotificationLoop::new(4);
        let sender = notifications.sender();
        assert!(matches!(
            sender.publish(TOPIC, alpha(0.5)),
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(
            sender.deliver(TOPIC, b"{not json"),
            Err(TransportError::Serialization(_))
        ));
    }

    #[test]
    fn order_is_preserved() {
        let notifications = NotificationLoop::new(2);
        let _handle = notifications.acquire().unwrap();
        let (target, rx) = sink();
        let _route = notifications
            .route(TOPIC, "Temporal Filter", Arc::downgrade(&target))
            .unwrap();

        let sender = notifications.sender();
        let producer = thread::spawn(move || {
            for step in 0..20 {
                sender.publish(TOPIC, alpha(step as f64 / 20.0)).unwrap();
            }
        });
        let seen: Vec<_> = (0..20)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap()[0].value)
            .collect();
        producer.join().unwrap();

        let expected: Vec<OptionValue> = (0..20).map(|s| (s as f64 / 20.0).into()).collect();
        assert_eq!(seen, expected);
    }

    /// Holds the last requester and lets it go from inside a delivery
    struct Releasing {
        handle: Mutex<Option<LoopHandle>>,
        entered: Sender<()>,
        gate: Receiver<()>,
        released: Sender<()>,
    }

    impl NotificationTarget for Releasing {
        fn deliver(&self, _options: &[NamedValue]) -> FilterResult<usize> {
            let handle = self.handle.lock()?.take();
            if let Some(handle) = handle {
                let _ = self.entered.send(());
                let _ = self.gate.recv_timeout(Duration::from_secs(5));
                drop(handle);
                let _ = self.released.send(());
            }
            Ok(0)
        }
    }

    #[test]
    fn last_release_from_callback_with_full_queue() {
        let notifications = NotificationLoop::new(1);
        let (entered_tx, entered) = unbounded();
        let (open, gate) = unbounded();
        let (released_tx, released) = unbounded();
        let target: Arc<dyn NotificationTarget> = Arc::new(Releasing {
            handle: Mutex::new(Some(notifications.acquire().unwrap())),
            entered: entered_tx,
            gate,
            released: released_tx,
        });
        let _route = notifications
            .route(TOPIC, "Temporal Filter", Arc::downgrade(&target))
            .unwrap();

        let sender = notifications.sender();
        sender.publish(TOPIC, alpha(0.1)).unwrap();
        entered.recv_timeout(Duration::from_secs(5)).unwrap();
        // The worker is busy; this fills the only slot.
        sender.publish(TOPIC, alpha(0.2)).unwrap();
        open.send(()).unwrap();

        assert!(released.recv_timeout(Duration::from_secs(5)).is_ok());
        assert!(!notifications.is_running());
        assert_eq!(notifications.requesters(), 0);
    }
}
