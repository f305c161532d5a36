//! Retry timing policies.
//!
//! This module groups the knobs that control **how long** to wait between
//! attempts. Whether to retry at all is decided by error classification
//! ([`ExecError::is_retryable`](crate::ExecError::is_retryable)), not here.
//!
//! ## Contents
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy to avoid thundering herd
//!
//! ## Quick wiring
//! ```text
//! EngineConfig { backoff: BackoffPolicy, .. }
//!      └─► core::engine::Engine uses backoff.next(attempt - 1)
//!          to schedule the sleep before the next attempt
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → first=2s, factor=2.0, max=60s, jitter=None
//!   (a 2s/4s schedule for the stock three-attempt budget).
//! - `JitterPolicy::None` by default; consider `Equal` for busy deployments.

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
