//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by the engine and the
//! process registry.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Engine` (attempt lifecycle, backoff scheduling),
//!   `ProcessRegistry` (drain).
//! - **Consumers**: the engine's subscriber listener, which forwards every
//!   event to each registered [`Subscribe`](crate::Subscribe) implementation
//!   (the audit writer among them).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
