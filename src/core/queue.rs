//! # Admission queue: bounded-concurrency FIFO gate.
//!
//! [`AdmissionQueue`] caps how many attempts run simultaneously across all
//! task requests. Callers acquire a [`SlotGuard`] before starting work; the
//! guard releases the slot on drop, so acquire/release are paired on every
//! path — success, error, panic or cancellation.
//!
//! ## Rules
//! - Waiters are served strictly FIFO (the fairness guarantee of
//!   [`tokio::sync::Semaphore`]).
//! - Waiting is cancellable: if the caller's token fires while queued, the
//!   wait aborts with [`ExecError::Canceled`] and no slot is consumed.
//! - One slot covers a whole task request (all its attempts), not one
//!   attempt.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::error::ExecError;

/// Bounded-concurrency gate with FIFO waiter ordering.
#[derive(Clone, Debug)]
pub struct AdmissionQueue {
    sem: Arc<Semaphore>,
    limit: usize,
}

/// A held admission slot. Dropping the guard releases the slot and wakes the
/// head waiter, if any.
#[derive(Debug)]
pub struct SlotGuard {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionQueue {
    /// Creates a queue with the given pool size (clamped to min 1).
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            sem: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Waits for a free slot, suspending the caller FIFO behind earlier
    /// waiters.
    ///
    /// Returns [`ExecError::Canceled`] if `cancel` fires first.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<SlotGuard, ExecError> {
        tokio::select! {
            permit = self.sem.clone().acquire_owned() => match permit {
                Ok(permit) => Ok(SlotGuard { _permit: permit }),
                // The semaphore is never closed by this crate; treat a close
                // as a shutdown-driven cancellation.
                Err(_closed) => Err(ExecError::Canceled),
            },
            _ = cancel.cancelled() => Err(ExecError::Canceled),
        }
    }

    /// Returns the configured pool size.
    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns the number of currently free slots.
    #[inline]
    pub fn available(&self) -> usize {
        self.sem.available_permits()
    }
}
