//! # Event bus for broadcasting engine events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from the engine, the registry and any other
//! internal source.
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks or fails the caller.
//! - **Bounded capacity**: a single ring buffer stores recent events for all
//!   receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip
//!   `n` oldest items.
//! - **No persistence**: events are lost if there are no active receivers at
//!   send time. That is by contract — audit records are best-effort and must
//!   never affect a request's outcome.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for engine events.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately.
/// - **Fire-and-forget**: no delivery or durability guarantees.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to min 1).
    ///
    /// Capacity is shared across all receivers; receivers that lag behind
    /// more than `capacity` events observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers, the event is dropped; this function still
    /// returns immediately.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    ///
    /// Each call creates an independent receiver; a receiver only gets
    /// events sent after it subscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
