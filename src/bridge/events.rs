//! # Bridge Events
//!
//! Observer registries for the bridge service.
//!
//! State changes are delivered synchronously to listeners on the pump thread.
//! Telemetry is delivered through unbounded channels so raising an event never
//! waits for the consumer.

use std::fmt;

use tokio::sync::mpsc;

use crate::error::FailureKind;

/// Connection state notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChanged {
    /// The transition was caused by a failure
    pub failure: bool,

    /// Connection is open after the transition
    pub connected: bool,

    /// Persistent error, cleared only by the next successful connect
    pub error: Option<FailureKind>,
}

/// Synchronous state-change callback
pub type StateListener = Box<dyn Fn(&StateChanged) + Send + Sync>;

/// Registry of state-change listeners
#[derive(Default)]
pub struct StateListeners {
    listeners: Vec<StateListener>,
}

impl StateListeners {
    pub fn add(&mut self, listener: StateListener) {
        self.listeners.push(listener);
    }

    pub fn notify(&self, change: &StateChanged) {
        for listener in &self.listeners {
            listener(change);
        }
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

impl fmt::Debug for StateListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}

/// Fan-out of one telemetry stream to any number of channel subscribers
#[derive(Debug)]
pub struct EventStream<T> {
    subscribers: Vec<mpsc::UnboundedSender<T>>,
}

impl<T> Default for EventStream<T> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<T: Clone> EventStream<T> {
    /// Register a new subscriber
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber without waiting.
    ///
    /// Subscribers whose receiver was dropped are removed. Returns the number
    /// of subscribers the event reached.
    pub fn emit(&mut self, event: T) -> usize {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        self.subscribers.len()
    }

    /// Drop every subscriber, closing their channels
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}
