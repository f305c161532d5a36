//! Error types used by the promptvisor engine.
//!
//! A single enum, [`ExecError`], covers every way a task request can fail.
//! The variants split into two families:
//!
//! - **Fatal** — [`ExecError::Validation`], [`ExecError::Canceled`],
//!   [`ExecError::CircuitBreaker`], [`ExecError::Exhausted`]. These stop the
//!   retry loop immediately and propagate to the caller.
//! - **Retryable** — [`ExecError::Timeout`], [`ExecError::Fail`],
//!   [`ExecError::Parse`]. These are swallowed by the retry loop until the
//!   attempt budget runs out.
//!
//! Display output for fatal variants carries a stable classification prefix
//! (`ValidationError:`, `AbortError:`, `Circuit Breaker:`) so callers can
//! distinguish failure classes from the message alone, without matching on
//! the enum.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by task request execution.
///
/// Some errors are retryable (`Timeout`, `Fail`, `Parse`), the rest are
/// fatal and short-circuit the retry loop.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ExecError {
    /// Prompt rejected before any slot was taken or process spawned.
    #[error("ValidationError: {reason}")]
    Validation {
        /// Why the prompt was rejected (empty, oversized).
        reason: String,
    },

    /// The caller's cancellation token fired, or the registry drained the
    /// process during host shutdown. Always wins a race against completion.
    #[error("AbortError: operation cancelled")]
    Canceled,

    /// A subprocess stream exceeded the per-stream byte ceiling and the
    /// process was killed to protect host memory.
    #[error("Circuit Breaker: output exceeded {limit} bytes")]
    CircuitBreaker {
        /// The configured per-stream ceiling that was breached.
        limit: usize,
    },

    /// The attempt exceeded its wall-clock budget.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// The subprocess failed: spawn error, I/O error, or non-zero exit.
    #[error("execution failed: {reason}")]
    Fail {
        /// Captured stderr, or a generic message when stderr was empty.
        reason: String,
    },

    /// The subprocess exited cleanly but its output could not be coerced
    /// into the expected shape.
    #[error("no valid response from tool")]
    Parse,

    /// All retryable attempts were used up. Terminal; wraps the last error.
    #[error("no valid response after {attempts} attempts: {last}")]
    Exhausted {
        /// How many attempts ran.
        attempts: u32,
        /// Message of the last underlying failure.
        last: String,
    },
}

impl ExecError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use promptvisor::ExecError;
    /// use std::time::Duration;
    ///
    /// let err = ExecError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "exec_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ExecError::Validation { .. } => "exec_validation",
            ExecError::Canceled => "exec_canceled",
            ExecError::CircuitBreaker { .. } => "exec_circuit_breaker",
            ExecError::Timeout { .. } => "exec_timeout",
            ExecError::Fail { .. } => "exec_failed",
            ExecError::Parse => "exec_no_valid_response",
            ExecError::Exhausted { .. } => "exec_exhausted",
        }
    }

    /// Indicates whether another attempt may succeed.
    ///
    /// Returns `true` for [`ExecError::Timeout`], [`ExecError::Fail`] and
    /// [`ExecError::Parse`], `false` otherwise.
    ///
    /// # Example
    /// ```
    /// use promptvisor::ExecError;
    ///
    /// let retryable = ExecError::Fail { reason: "exit code: 1".into() };
    /// assert!(retryable.is_retryable());
    ///
    /// let fatal = ExecError::Canceled;
    /// assert!(!fatal.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExecError::Timeout { .. } | ExecError::Fail { .. } | ExecError::Parse
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_variants_are_not_retryable() {
        assert!(
            !ExecError::Validation {
                reason: "too large".into()
            }
            .is_retryable()
        );
        assert!(!ExecError::Canceled.is_retryable());
        assert!(!ExecError::CircuitBreaker { limit: 1024 }.is_retryable());
        assert!(
            !ExecError::Exhausted {
                attempts: 3,
                last: "boom".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn retryable_variants() {
        assert!(
            ExecError::Timeout {
                timeout: Duration::from_secs(5)
            }
            .is_retryable()
        );
        assert!(
            ExecError::Fail {
                reason: "exit code: 2".into()
            }
            .is_retryable()
        );
        assert!(ExecError::Parse.is_retryable());
    }

    #[test]
    fn classification_prefixes_are_stable() {
        let v = ExecError::Validation {
            reason: "prompt is empty".into(),
        };
        assert!(v.to_string().starts_with("ValidationError:"));

        assert!(ExecError::Canceled.to_string().starts_with("AbortError:"));

        let cb = ExecError::CircuitBreaker { limit: 10 };
        assert!(cb.to_string().starts_with("Circuit Breaker:"));
    }
}
