//! # Engine configuration.
//!
//! Provides [`EngineConfig`] centralized settings for the execution engine.
//!
//! ## Field semantics
//! - `program` / `base_args` / `model_flag`: how the external tool is
//!   invoked. The model flag is appended as `<flag> <model>` when set.
//! - `allowed_models` / `default_model`: the compiled-in allow-list; unknown
//!   requests silently fall back to the default rather than failing.
//! - `max_concurrent`: admission pool size (min 1, enforced by the queue).
//! - `max_attempts`: retry budget per task request (min 1).
//! - `max_prompt_bytes`: validation ceiling applied before queueing.
//! - `max_capture_bytes`: per-stream circuit-breaker ceiling.
//! - `timeout`: default per-attempt wall-clock budget.
//! - `audit_dir`: where the audit writer appends; `None` disables auditing.

use std::path::PathBuf;
use std::time::Duration;

use crate::policies::BackoffPolicy;

/// Global configuration for the execution engine.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// External tool binary to invoke.
    pub program: String,

    /// Fixed arguments forcing non-interactive operation.
    pub base_args: Vec<String>,

    /// Flag used to pass the resolved model (`None` = tool takes no model).
    pub model_flag: Option<String>,

    /// Model used when the requested one is absent or not allow-listed.
    pub default_model: String,

    /// Compiled-in model allow-list.
    pub allowed_models: Vec<String>,

    /// Maximum number of attempts running simultaneously, across all task
    /// requests.
    pub max_concurrent: usize,

    /// Attempt budget per task request.
    pub max_attempts: u32,

    /// Maximum prompt payload size in bytes. Larger prompts are rejected
    /// before any slot is taken or process spawned.
    pub max_prompt_bytes: usize,

    /// Per-stream output ceiling in bytes. Exceeding it kills the process
    /// and fails the whole request with the circuit-breaker classification.
    pub max_capture_bytes: usize,

    /// Default per-attempt wall-clock budget (overridable per request).
    pub timeout: Duration,

    /// Retry delay schedule.
    pub backoff: BackoffPolicy,

    /// Capacity of the event bus ring buffer (min 1, enforced by the bus).
    pub bus_capacity: usize,

    /// Audit log directory. `None` disables the built-in audit writer.
    pub audit_dir: Option<PathBuf>,
}

impl EngineConfig {
    /// Resolves the requested model against the allow-list.
    ///
    /// Unknown or absent values fall back to [`EngineConfig::default_model`]
    /// silently; a bad model name must not fail the request.
    pub fn resolve_model(&self, requested: Option<&str>) -> String {
        match requested {
            Some(m) if self.allowed_models.iter().any(|a| a == m) => m.to_string(),
            _ => self.default_model.clone(),
        }
    }

    /// Returns the admission pool size, clamped to a minimum of 1.
    #[inline]
    pub fn concurrency(&self) -> usize {
        self.max_concurrent.max(1)
    }

    /// Returns the attempt budget, clamped to a minimum of 1.
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for EngineConfig {
    /// Default configuration:
    ///
    /// - `program = "claude"` with `--print` (non-interactive, plain output)
    /// - `NO_COLOR`/`CI`/`TERM=dumb` env overrides are applied at spawn
    /// - `default_model = "sonnet"`, allow-list `sonnet`/`opus`/`haiku`
    /// - `max_concurrent = 2`, `max_attempts = 3`
    /// - `max_prompt_bytes = 512 KiB`, `max_capture_bytes = 10 MiB`
    /// - `timeout = 5 min`
    /// - `backoff = BackoffPolicy::default()` (2s, 4s, ...)
    /// - `audit_dir = None` (auditing off unless configured)
    fn default() -> Self {
        Self {
            program: "claude".to_string(),
            base_args: vec!["--print".to_string()],
            model_flag: Some("--model".to_string()),
            default_model: "sonnet".to_string(),
            allowed_models: vec![
                "sonnet".to_string(),
                "opus".to_string(),
                "haiku".to_string(),
            ],
            max_concurrent: 2,
            max_attempts: 3,
            max_prompt_bytes: 512 * 1024,
            max_capture_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_secs(300),
            backoff: BackoffPolicy::default(),
            bus_capacity: 1024,
            audit_dir: None,
        }
    }
}
