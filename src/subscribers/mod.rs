//! # Event subscribers for the engine.
//!
//! This module provides the [`Subscribe`] trait and the built-in
//! [`AuditWriter`] for handling events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Engine ── publish(Event) ──► Bus ──► engine listener task
//!                                             │
//!                                             ├──► AuditWriter (audit-YYYY-MM-DD.log)
//!                                             └──► custom Subscribe impls
//! ```
//!
//! Delivery is best-effort: publishing never blocks, a lagging listener
//! skips events, and subscriber errors are invisible to the request path.

mod audit;
mod subscriber;

pub use audit::AuditWriter;
pub use subscriber::Subscribe;
