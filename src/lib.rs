//! # promptvisor
//!
//! **Promptvisor** is an execution engine for external AI CLI tools.
//!
//! It runs prompt-driven subprocess requests with bounded concurrency,
//! retries, output ceilings and guaranteed cleanup. The crate is designed as
//! a building block for hosts that delegate generation work (quizzes,
//! summaries, structured extraction) to a command-line AI tool.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ task request │   │ task request │   │ task request │
//!     │ (prompt+opts)│   │ (prompt+opts)│   │ (prompt+opts)│
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Engine                                                           │
//! │  - validate prompt (fail fast, before queueing)                   │
//! │  - AdmissionQueue (FIFO, max_concurrent slots)                    │
//! │  - retry loop (max_attempts, BackoffPolicy between attempts)      │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   attempt    │   │   attempt    │   │   attempt    │
//!     │ (subprocess) │   │ (subprocess) │   │ (subprocess) │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘
//!      │ registered in ProcessRegistry before any I/O
//!      │ stdout/stderr capped per stream (circuit breaker)
//!      │ killed on timeout / cancellation / drain
//!      ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                      Bus (broadcast channel)                      │
//! │   ExecStarting / ExecSucceeded / ExecFailed / BackoffScheduled    │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                        subscriber listener
//!                        (AuditWriter, user Subscribe impls)
//! ```
//!
//! ### Lifecycle
//! ```text
//! Engine::execute(prompt, opts)
//!
//! ├─► validate_prompt (ValidationError ─► return, no slot taken)
//! ├─► acquire admission slot (FIFO, cancellable)
//! └─► loop {
//!       ├─► attempt += 1
//!       ├─► publish ExecStarting{ model, attempt }
//!       ├─► run_attempt(spawn ─► register ─► write prompt ─► capture)
//!       │       │
//!       │       ├─ Ok(value) ──► publish ExecSucceeded ─► return Ok
//!       │       │
//!       │       └─ Err ──► publish ExecFailed{ detail }
//!       │                  ├─ fatal (Validation/Canceled/CircuitBreaker)
//!       │                  │      ─► return Err
//!       │                  ├─ attempt == max ─► return Exhausted
//!       │                  └─ retryable (Timeout/Fail/Parse):
//!       │                       ├─ delay = backoff.next(attempt - 1)
//!       │                       ├─ publish BackoffScheduled{ delay }
//!       │                       └─ sleep(delay) (cancellable) ─► continue
//!       │
//!       └─ exit conditions:
//!            - caller token cancelled (slot wait, attempt, or backoff)
//!            - registry drained (host shutdown)
//! }
//!
//! On exit: the slot guard and process guard drop, releasing the slot and
//! unregistering the child on every path.
//! ```
//!
//! ## Features
//! | Area               | Description                                                       | Key types / traits                  |
//! |--------------------|-------------------------------------------------------------------|-------------------------------------|
//! | **Execution**      | Validate, admit and retry prompt requests against a CLI tool.     | [`Engine`], [`ExecOptions`]         |
//! | **Admission**      | Bounded-concurrency FIFO gate shared by all requests.             | [`AdmissionQueue`], [`SlotGuard`]   |
//! | **Process safety** | Track live subprocesses; drain them on host shutdown.             | [`ProcessRegistry`], [`ProcessGuard`] |
//! | **Parsing**        | Recover structured JSON from messy tool output.                   | [`parse`], [`ExpectedShape`]        |
//! | **Policies**       | Retry delay schedules with optional jitter.                       | [`BackoffPolicy`], [`JitterPolicy`] |
//! | **Subscriber API** | Hook into request lifecycle events (auditing, metrics).           | [`Subscribe`], [`AuditWriter`]      |
//! | **Errors**         | Typed errors with a fatal/retryable classification.               | [`ExecError`]                       |
//! | **Configuration**  | Centralize engine settings.                                       | [`EngineConfig`]                    |
//!
//! ## Example
//! ```rust
//! use promptvisor::{Engine, EngineConfig, ExecOptions, ExpectedShape};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // A stand-in tool: reads the prompt, answers with a JSON array.
//!     let mut cfg = EngineConfig::default();
//!     cfg.program = "sh".to_string();
//!     cfg.base_args = vec![
//!         "-c".to_string(),
//!         "cat >/dev/null; echo '[1, 2, 3]'".to_string(),
//!     ];
//!     cfg.model_flag = None;
//!
//!     let engine = Engine::new(cfg);
//!     engine.drain_on_signal();
//!
//!     let opts = ExecOptions::default().with_shape(ExpectedShape::JsonArray);
//!     let value = engine.execute("three numbers, please", opts).await?;
//!     assert_eq!(value, serde_json::json!([1, 2, 3]));
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod events;
mod parse;
mod policies;
mod request;
mod subscribers;

// ---- Public re-exports ----

pub use core::{AdmissionQueue, Engine, EngineConfig, ProcessGuard, ProcessRegistry, SlotGuard};
pub use error::ExecError;
pub use events::{Bus, Event, EventKind};
pub use parse::{ExpectedShape, parse};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use request::ExecOptions;
pub use subscribers::{AuditWriter, Subscribe};
