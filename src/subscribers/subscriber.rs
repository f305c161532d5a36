//! # Event subscriber trait.
//!
//! Provides [`Subscribe`] an extension point for plugging custom event
//! handlers into the engine (audit files, metrics, alerts).
//!
//! ## Rules
//! - Subscribers run on the engine's listener task, sequentially and in
//!   event order; keep handlers short and non-blocking.
//! - Handlers must contain their own errors. A subscriber can never fail a
//!   task request: the engine does not observe handler outcomes.
//! - If the listener lags behind the bus, intervening events are dropped for
//!   all subscribers; delivery is best-effort by contract.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use promptvisor::{Subscribe, Event, EventKind};
//!
//! struct Metrics;
//!
//! #[async_trait]
//! impl Subscribe for Metrics {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::ExecFailed) {
//!             // export a metric, etc.
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "metrics" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for engine observability.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Called from the engine's listener task, not in the publisher context.
    /// Events are delivered in FIFO order.
    async fn on_event(&self, event: &Event);

    /// Returns the subscriber name used in logs.
    ///
    /// Prefer short, descriptive names (e.g., "audit", "metrics"). The
    /// default uses `type_name::<Self>()`, which can be verbose - override
    /// it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
