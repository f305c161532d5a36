//! # Task request options and input validation.
//!
//! [`ExecOptions`] is the options record accompanying one prompt: model,
//! timeout, working directory, expected output shape and cancellation token.
//! Options are validated once at [`Engine::execute`](crate::Engine::execute)
//! entry and never mutated afterwards.
//!
//! The prompt itself travels separately as a `&str`; [`validate_prompt`]
//! enforces the payload bounds before any queue slot is taken or process
//! spawned.

use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::ExecError;
use crate::parse::ExpectedShape;

/// Options for one task request.
///
/// All fields are optional except the expected shape (which defaults to
/// [`ExpectedShape::JsonObject`]) and the cancellation token (which defaults
/// to a fresh, never-fired token).
///
/// # Example
/// ```
/// use std::time::Duration;
/// use promptvisor::{ExecOptions, ExpectedShape};
///
/// let opts = ExecOptions::default()
///     .with_model("opus")
///     .with_timeout(Duration::from_secs(120))
///     .with_shape(ExpectedShape::JsonArray);
///
/// assert_eq!(opts.model.as_deref(), Some("opus"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct ExecOptions {
    /// Requested model. Unknown values silently fall back to the configured
    /// default; see [`EngineConfig::resolve_model`](crate::EngineConfig::resolve_model).
    pub model: Option<String>,
    /// Per-attempt wall-clock budget. `None` uses the engine default.
    pub timeout: Option<Duration>,
    /// Working directory for the spawned tool.
    pub working_dir: Option<PathBuf>,
    /// Expected shape of the tool's output.
    pub shape: ExpectedShape,
    /// Cancellation token observed at every suspension point (slot wait,
    /// process wait, backoff sleep).
    pub cancel: CancellationToken,
}

impl ExecOptions {
    /// Sets the requested model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the working directory for the spawned tool.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Sets the expected output shape.
    pub fn with_shape(mut self, shape: ExpectedShape) -> Self {
        self.shape = shape;
        self
    }

    /// Sets the cancellation token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Validates the prompt payload. Fails fast, before any slot is taken or
/// process spawned, with the fatal [`ExecError::Validation`] classification.
pub(crate) fn validate_prompt(prompt: &str, max_bytes: usize) -> Result<(), ExecError> {
    if prompt.trim().is_empty() {
        return Err(ExecError::Validation {
            reason: "prompt is empty".to_string(),
        });
    }
    if prompt.len() > max_bytes {
        return Err(ExecError::Validation {
            reason: format!("prompt exceeds {max_bytes} bytes (got {})", prompt.len()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_prompt_is_rejected() {
        let err = validate_prompt("   \n", 1024).unwrap_err();
        assert_eq!(err.as_label(), "exec_validation");
    }

    #[test]
    fn oversized_prompt_is_rejected() {
        let prompt = "x".repeat(1025);
        let err = validate_prompt(&prompt, 1024).unwrap_err();
        assert!(err.to_string().starts_with("ValidationError:"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn prompt_at_limit_passes() {
        let prompt = "x".repeat(1024);
        assert!(validate_prompt(&prompt, 1024).is_ok());
    }

    #[test]
    fn default_options() {
        let opts = ExecOptions::default();
        assert!(opts.model.is_none());
        assert!(opts.timeout.is_none());
        assert!(opts.working_dir.is_none());
        assert_eq!(opts.shape, ExpectedShape::JsonObject);
        assert!(!opts.cancel.is_cancelled());
    }
}
