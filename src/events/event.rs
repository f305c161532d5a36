//! # Runtime events emitted by the execution engine.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Attempt lifecycle**: one event pair per attempt (starting, then
//!   succeeded or failed)
//! - **Scheduling**: retry delays chosen by the backoff policy
//! - **Shutdown**: registry drain during host termination
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! model name, attempt number, durations and free-text detail.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.
//!
//! ## Example
//! ```rust
//! use promptvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ExecFailed)
//!     .with_model("sonnet")
//!     .with_attempt(2)
//!     .with_detail("exit code: 1");
//!
//! assert_eq!(ev.kind, EventKind::ExecFailed);
//! assert_eq!(ev.model.as_deref(), Some("sonnet"));
//! assert_eq!(ev.detail.as_deref(), Some("exit code: 1"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of engine events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Attempt lifecycle events ===
    /// An attempt is starting (the audit log's START record).
    ///
    /// Sets:
    /// - `model`: resolved model name
    /// - `attempt`: attempt number (1-based, per request)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    ExecStarting,

    /// An attempt produced a parsed value (the audit log's SUCCESS record).
    ///
    /// Sets:
    /// - `model`: resolved model name
    /// - `attempt`: attempt number
    /// - `duration_ms`: elapsed attempt time (ms)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    ExecSucceeded,

    /// An attempt failed (the audit log's ERROR record). Published for
    /// retryable and fatal failures alike.
    ///
    /// Sets:
    /// - `model`: resolved model name
    /// - `attempt`: attempt number
    /// - `duration_ms`: elapsed attempt time (ms)
    /// - `detail`: failure message
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    ExecFailed,

    // === Scheduling events ===
    /// A retry was scheduled after a retryable failure.
    ///
    /// Sets:
    /// - `model`: resolved model name
    /// - `attempt`: the attempt that just failed
    /// - `delay_ms`: delay before the next attempt (ms)
    /// - `detail`: last failure message
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    BackoffScheduled,

    // === Shutdown events ===
    /// The process registry is draining all live subprocesses.
    ///
    /// Sets:
    /// - `detail`: number of live processes at drain time
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    DrainRequested,
}

/// Engine event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Resolved model name, if applicable.
    pub model: Option<Arc<str>>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Elapsed attempt time in milliseconds.
    pub duration_ms: Option<u64>,
    /// Backoff delay before the next attempt in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable detail (error messages, drain counts, etc.).
    pub detail: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next
    /// sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            model: None,
            attempt: None,
            duration_ms: None,
            delay_ms: None,
            detail: None,
        }
    }

    /// Attaches a model name.
    #[inline]
    pub fn with_model(mut self, model: impl Into<Arc<str>>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches an elapsed duration (stored as milliseconds).
    #[inline]
    pub fn with_duration(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u64::MAX)) as u64;
        self.duration_ms = Some(ms);
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a human-readable detail string.
    #[inline]
    pub fn with_detail(mut self, detail: impl Into<Arc<str>>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let a = Event::new(EventKind::ExecStarting);
        let b = Event::new(EventKind::ExecSucceeded);
        let c = Event::new(EventKind::ExecFailed);
        assert!(a.seq < b.seq);
        assert!(b.seq < c.seq);
    }

    #[test]
    fn builders_set_fields() {
        let ev = Event::new(EventKind::BackoffScheduled)
            .with_model("sonnet")
            .with_attempt(1)
            .with_delay(Duration::from_secs(2))
            .with_detail("exit code: 1");

        assert_eq!(ev.model.as_deref(), Some("sonnet"));
        assert_eq!(ev.attempt, Some(1));
        assert_eq!(ev.delay_ms, Some(2000));
        assert_eq!(ev.detail.as_deref(), Some("exit code: 1"));
        assert!(ev.duration_ms.is_none());
    }
}
