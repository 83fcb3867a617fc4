use log::{debug, warn};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("Listener failed handling {event}: {reason}")]
    ListenerFailed { event: &'static str, reason: String },
    #[error("Listener list lock poisoned")]
    Poisoned,
}

/// An event travelling over a [`Bus`], identified by its name.
pub trait BusEvent {
    fn name(&self) -> &'static str;
}

/// Subscriber of a [`Bus`].
///
/// `events` lists the event names this listener has a handler for, the bus
/// never calls `on_event` with any other event.
pub trait Listener<E: BusEvent>: Send + Sync {
    fn events(&self) -> &'static [&'static str];
    fn on_event(&self, event: &E) -> Result<(), BusError>;
}

/// Outcome of a single [`Bus::publish`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Delivery {
    pub notified: usize,
    pub failed: usize,
}

/// Per-device, in-process publish/subscribe router.
///
/// Delivery is synchronous: every handler has run before `publish` returns.
/// A listener is registered at most once (identity of the `Arc`), and a
/// failing handler does not keep the remaining listeners from being called.
pub struct Bus<E: BusEvent> {
    name: &'static str,
    listeners: Mutex<Vec<Arc<dyn Listener<E>>>>,
}

impl<E: BusEvent> Bus<E> {
    pub fn new(name: &'static str) -> Self {
        Bus { name, listeners: Mutex::new(Vec::new()) }
    }

    /// Returns false if the listener was already registered.
    pub fn subscribe(&self, listener: Arc<dyn Listener<E>>) -> Result<bool, BusError> {
        let mut listeners = self.listeners.lock().map_err(|_| BusError::Poisoned)?;
        if listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            debug!("Listener already registered on {} bus", self.name);
            return Ok(false);
        }
        listeners.push(listener);
        Ok(true)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn publish(&self, event: &E) -> Result<Delivery, BusError> {
        /* Work on a snapshot, listeners may subscribe while we deliver */
        let snapshot: Vec<Arc<dyn Listener<E>>> = self.listeners.lock()
            .map_err(|_| BusError::Poisoned)?
            .clone();

        let name = event.name();
        let mut delivery = Delivery::default();
        for listener in snapshot.iter().filter(|l| l.events().contains(&name)) {
            match listener.on_event(event) {
                Ok(()) => delivery.notified += 1,
                Err(e) => {
                    warn!("{} bus: {e}", self.name);
                    delivery.failed += 1;
                }
            }
        }

        debug!("{} bus delivered {name} to {} listener(s)", self.name, delivery.notified);
        Ok(delivery)
    }
}
