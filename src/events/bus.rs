//! # Event bus for broadcasting lifecycle events.
//!
//! [`Bus`] is a wrapper around [`tokio::sync::broadcast`] that allows a task
//! executor to broadcast [`Event`]s to multiple subscribers simultaneously.
//!
//! ## Key characteristics:
//! - **Broadcast semantics**: all active subscribers receive a clone of each event
//! - **Non-persistent**: events are lost if there are no active subscribers
//! - **Bounded capacity**: old events are dropped when the channel is full
//! - **Multiple subscribers**: any number of receivers can subscribe independently
//!
//! Publishing never blocks and no library behaviour depends on a subscriber
//! being present; the bus is observability only.

use tokio::sync::broadcast;

use super::event::Event;

/// Default per-task channel capacity.
const BUS_CAPACITY: usize = 64;

/// Broadcast channel for lifecycle events.
///
/// Wrapper over [`tokio::sync::broadcast`] that provides `publish`/`subscribe`
/// methods for fanning [`Event`]s out to multiple concurrent subscribers.
#[derive(Clone)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the default channel capacity.
    pub fn new() -> Self {
        Self::with_capacity(BUS_CAPACITY)
    }

    /// Creates a new bus with the given channel capacity.
    ///
    /// When capacity is exceeded, the oldest unsent events are dropped.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes an event to all active subscribers.
    ///
    /// If there are no active subscribers, the event is dropped silently.
    /// This is intentional as the system can operate without observers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new subscriber that will receive all future events.
    ///
    /// Each call creates an independent receiver; every subscriber receives
    /// a clone of every event published after its subscription.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}
